//! The `url_overlap` management command.
//!
//! Audits a URL configuration for routes that match the same paths. Routes
//! come from the configured resolver (if any), from `--route` arguments
//! parsed with the global converter registry and from raw `--regex`
//! arguments, in that order. The exit status is the number of overlaps plus
//! the number of shadowed routes, capped at 255.

use std::sync::Arc;

use async_trait::async_trait;
use pathconv_core::utils::anchored;
use pathconv_core::{PathconvResult, Settings};
use pathconv_urls::urls::pattern::{path_with, view};
use pathconv_urls::{registry, URLResolver};

use crate::command::ManagementCommand;
use crate::overlap::{analyze, OverlapReport, RouteAutomaton};

/// Searches for overlapping URL patterns.
#[derive(Debug, Default, Clone)]
pub struct UrlOverlapCommand {
    url_conf: Option<Arc<URLResolver>>,
}

impl UrlOverlapCommand {
    /// Creates the command without a URL configuration; only routes passed
    /// on the command line are audited.
    pub fn new() -> Self {
        Self::default()
    }

    /// Audits `url_conf` in addition to command-line routes.
    #[must_use]
    pub fn with_url_conf(mut self, url_conf: Arc<URLResolver>) -> Self {
        self.url_conf = Some(url_conf);
        self
    }

    /// Collects `(label, anchored regex)` pairs in audit order.
    pub fn collect(&self, routes: &[String], regexes: &[String]) -> PathconvResult<Vec<(String, String)>> {
        let mut collected = Vec::new();

        if let Some(url_conf) = &self.url_conf {
            for rr in url_conf.route_regexes() {
                let label = match rr.name {
                    Some(name) => format!("{} [{name}]", rr.route),
                    None => rr.route,
                };
                collected.push((label, rr.regex));
            }
        }

        {
            let converters = registry();
            for route in routes {
                let pattern = path_with(&converters, route, view(|_m| async { Ok(String::new()) }), None)?;
                collected.push((route.clone(), pattern.regex().as_str().to_string()));
            }
        }

        for regex in regexes {
            collected.push((regex.clone(), anchored(regex)));
        }
        Ok(collected)
    }
}

/// Compiles the collected routes and checks every pair.
pub fn audit(routes: &[(String, String)], max_states: usize) -> PathconvResult<OverlapReport> {
    let automata = routes
        .iter()
        .map(|(label, regex)| RouteAutomaton::new(label.clone(), regex))
        .collect::<PathconvResult<Vec<_>>>()?;
    Ok(analyze(&automata, max_states))
}

#[async_trait]
impl ManagementCommand for UrlOverlapCommand {
    fn name(&self) -> &'static str {
        "url_overlap"
    }

    fn help(&self) -> &'static str {
        "Search if two or more URLs overlap"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd.arg(
            clap::Arg::new("regex")
                .long("regex")
                .action(clap::ArgAction::Append)
                .help("A raw regex matched against the whole path"),
        )
        .arg(
            clap::Arg::new("route")
                .long("route")
                .action(clap::ArgAction::Append)
                .help("A route with <converter:name> segments"),
        )
        .arg(
            clap::Arg::new("max-states")
                .long("max-states")
                .value_parser(clap::value_parser!(usize))
                .help("Product states explored per pair (overrides settings)"),
        )
    }

    async fn handle(&self, matches: &clap::ArgMatches, settings: &Settings) -> PathconvResult<u8> {
        let strings = |id: &str| -> Vec<String> {
            matches
                .get_many::<String>(id)
                .map(|vs| vs.cloned().collect())
                .unwrap_or_default()
        };
        let max_states = matches
            .get_one::<usize>("max-states")
            .copied()
            .unwrap_or(settings.overlap.max_states);

        let routes = self.collect(&strings("route"), &strings("regex"))?;
        for (label, regex) in &routes {
            println!("{label}\t{regex}");
        }

        let report = audit(&routes, max_states)?;
        for finding in &report.findings {
            tracing::warn!(%finding, "url overlap");
            println!("{finding}");
        }
        println!(
            "{} routes: {} overlaps, {} to reorder, {} undecided.",
            routes.len(),
            report.overlaps(),
            report.reorders(),
            report.undecided()
        );
        Ok(report.exit_status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlap::Finding;
    use pathconv_urls::urls::pattern::path;
    use pathconv_urls::urls::resolver::{include, include_with, root};
    use pathconv_urls::URLEntry;

    fn noop() -> pathconv_urls::urls::pattern::ViewFn {
        view(|_m| async { Ok(String::new()) })
    }

    fn url_conf() -> Arc<URLResolver> {
        let users = include(
            "users/",
            vec![
                URLEntry::Pattern(path("<str:name>/", noop(), Some("by-name")).unwrap()),
                URLEntry::Pattern(path("<int:pk>/", noop(), Some("by-pk")).unwrap()),
            ],
            Some("users"),
            None,
        )
        .unwrap();
        Arc::new(
            root(vec![
                URLEntry::Resolver(users),
                URLEntry::Pattern(path("archive/<date:day>/", noop(), None).unwrap()),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn test_collect_in_order() {
        let cmd = UrlOverlapCommand::new().with_url_conf(url_conf());
        let routes = cmd
            .collect(&["archive/<str:day>/".to_string()], &["^x$".to_string()])
            .unwrap();
        let labels: Vec<&str> = routes.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "users/<str:name>/ [users:by-name]",
                "users/<int:pk>/ [users:by-pk]",
                "archive/<date:day>/",
                "archive/<str:day>/",
                "^x$",
            ]
        );
        assert_eq!(routes[4].1, "^(?:^x$)$");
    }

    #[test]
    fn test_audit_finds_shadowed_route() {
        let cmd = UrlOverlapCommand::new().with_url_conf(url_conf());
        let report = audit(&cmd.collect(&[], &[]).unwrap(), 10_000).unwrap();
        assert_eq!(report.overlaps(), 1);
        assert_eq!(report.reorders(), 1);
        assert!(report.findings.contains(&Finding::Unreachable {
            earlier: "users/<str:name>/ [users:by-name]".to_string(),
            later: "users/<int:pk>/ [users:by-pk]".to_string(),
        }));
        assert_eq!(report.exit_status(), 2);
    }

    #[test]
    fn test_audit_command_line_only() {
        let cmd = UrlOverlapCommand::new();
        let routes = cmd
            .collect(
                &["a/<int:x>/".to_string()],
                &["b/[0-9]+/".to_string(), "a/1/".to_string()],
            )
            .unwrap();
        let report = audit(&routes, 10_000).unwrap();
        assert_eq!((report.overlaps(), report.reorders()), (1, 1));
        let Finding::Overlap { witness, .. } = &report.findings[0] else {
            panic!("expected an overlap first");
        };
        assert_eq!(witness, "a/1/");
    }

    #[test]
    fn test_audit_include_reusing_parameter_name() {
        let users = {
            let converters = registry();
            let detail = path_with(&converters, "<int:id>/", noop(), Some("detail")).unwrap();
            include_with(&converters, "users/<int:id>/", vec![URLEntry::Pattern(detail)], None, None)
                .unwrap()
        };
        let url_conf = Arc::new(root(vec![URLEntry::Resolver(users)]).unwrap());

        let routes = UrlOverlapCommand::new().with_url_conf(url_conf).collect(&[], &[]).unwrap();
        let report = audit(&routes, 10_000).unwrap();
        assert!(report.findings.is_empty());
        assert_eq!(report.exit_status(), 0);
    }
}
