//! Traces command.

use crate::cli::TracesArgs;
use crate::config::{AwsConfig, Settings};
use crate::error::{ExitCode, TracesResult};
use crate::puller::PullerSettings;
use crate::traces::{AwsToolkit, TracesRequest, do_traces};
use crate::xray::ClientOptions;

/// Region and profile given on the command line.
#[derive(Debug, Clone, Default)]
pub struct AwsOverrides {
    pub region: Option<String>,
    pub profile: Option<String>,
}

/// Build the dispatcher request. Command-line AWS options win over settings.
pub fn build_request(args: TracesArgs, aws: &AwsConfig, overrides: AwsOverrides) -> TracesRequest {
    let region = overrides.region.or_else(|| aws.region.clone());
    let profile = overrides.profile.or_else(|| aws.profile.clone());

    let client = ClientOptions::new(region).with_profile(profile);

    let TracesArgs {
        trace_ids,
        observability,
    } = args;

    TracesRequest {
        trace_ids,
        start_time: observability.start_time,
        end_time: observability.end_time,
        tail: observability.tail,
        unformatted: observability.unformatted,
        client,
    }
}

/// Run traces command until it completes or Ctrl-C is pressed.
pub async fn run(args: TracesArgs, settings: &Settings, overrides: AwsOverrides) -> ExitCode {
    let request = build_request(args, &settings.aws, overrides);
    let toolkit = AwsToolkit::new(PullerSettings::from(&settings.puller));

    run_until(do_traces(&toolkit, request), tokio::signal::ctrl_c()).await
}

/// Drive `work` to completion unless `interrupt` resolves first.
///
/// An interrupt is a normal way to stop tailing and exits with success.
pub(crate) async fn run_until<W, I>(work: W, interrupt: I) -> ExitCode
where
    W: Future<Output = TracesResult<()>>,
    I: Future,
{
    tokio::select! {
        result = work => match result {
            Ok(()) => ExitCode::Success,
            Err(e) => {
                eprintln!("Error: {e}");
                e.exit_code()
            }
        },
        _ = interrupt => {
            tracing::debug!(target: "cli", "interrupted");
            ExitCode::Success
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ObservabilityArgs;
    use crate::error::TracesError;
    use crate::time::TimeParseError;
    use std::future::{pending, ready};

    #[test]
    fn test_cli_region_overrides_settings() {
        let aws = AwsConfig {
            region: Some("us-east-1".to_string()),
            profile: Some("dev".to_string()),
        };
        let overrides = AwsOverrides {
            region: Some("eu-west-1".to_string()),
            profile: None,
        };

        let request = build_request(TracesArgs::default(), &aws, overrides);

        assert_eq!(request.client.region.as_deref(), Some("eu-west-1"));
        assert_eq!(request.client.profile.as_deref(), Some("dev"));
    }

    #[test]
    fn test_observability_args_are_copied() {
        let args = TracesArgs {
            trace_ids: vec!["1-a".to_string()],
            observability: ObservabilityArgs {
                start_time: Some("1h ago".to_string()),
                end_time: None,
                tail: true,
                unformatted: false,
            },
        };

        let request = build_request(args, &AwsConfig::default(), AwsOverrides::default());

        assert_eq!(request.trace_ids, vec!["1-a".to_string()]);
        assert_eq!(request.start_time.as_deref(), Some("1h ago"));
        assert!(request.tail);
        assert_eq!(request.client.region, None);
    }

    #[tokio::test]
    async fn test_interrupt_while_tailing_exits_successfully() {
        let code = run_until(pending::<TracesResult<()>>(), ready(())).await;
        assert_eq!(code, ExitCode::Success);
    }

    #[tokio::test]
    async fn test_error_before_interrupt_keeps_its_exit_code() {
        let failure = TracesError::from(TimeParseError::Unparsable {
            label: "start-time".to_string(),
            value: "last tuesday".to_string(),
        });

        let code = run_until(ready(Err(failure)), pending::<()>()).await;
        assert_eq!(code, ExitCode::UsageError);
    }

    #[tokio::test]
    async fn test_interrupt_stops_unfinished_work() {
        let work = async {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
            Err(TracesError::from(TimeParseError::Unparsable {
                label: "end-time".to_string(),
                value: "never".to_string(),
            }))
        };

        let code = run_until(work, tokio::time::sleep(std::time::Duration::from_millis(10))).await;
        assert_eq!(code, ExitCode::Success);
    }
}
