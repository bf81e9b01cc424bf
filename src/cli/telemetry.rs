use anyhow::{anyhow, Context, Result};
use opentelemetry::{global, trace::TracerProvider as _, KeyValue};
use opentelemetry_otlp::{WithExportConfig, WithTonicConfig};
use opentelemetry_sdk::{
    runtime,
    trace::{Tracer, TracerProvider},
    Resource,
};
use std::{env::var, sync::OnceLock, time::Duration};
use tonic::transport::ClientTlsConfig;
use tracing::{debug, Level};
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, EnvFilter, Registry,
};
use ulid::Ulid;
use url::Url;

use super::commands::logging::LogSettings;

const OTLP_ENDPOINT_ENV: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
const EXPORT_TIMEOUT: Duration = Duration::from_secs(3);

/// Floors for dependencies that are noisy at info and below. `--log-filter` can
/// lift any of them.
const QUIET_TARGETS: [&str; 6] = [
    "hyper=error",
    "h2=error",
    "tonic=warn",
    "reqwest=warn",
    "sqlx::query=warn",
    "opentelemetry_sdk=warn",
];

static TRACER_PROVIDER: OnceLock<TracerProvider> = OnceLock::new();

/// Build the filter: one default level for keyward, tower-http and anything
/// else, the quiet floors above, then user directives.
fn log_filter(settings: &LogSettings) -> Result<EnvFilter> {
    let level = LevelFilter::from_level(settings.level.unwrap_or(Level::ERROR));
    let mut filter = EnvFilter::default().add_directive(level.into());

    for directive in QUIET_TARGETS {
        filter = filter.add_directive(directive.parse()?);
    }

    let extra = settings.directives.as_deref().unwrap_or_default();
    for directive in extra.split(',').map(str::trim).filter(|d| !d.is_empty()) {
        filter = filter.add_directive(
            directive
                .parse()
                .with_context(|| format!("invalid log directive: {directive}"))?,
        );
    }

    Ok(filter)
}

/// Where spans go, parsed from `OTEL_EXPORTER_OTLP_ENDPOINT`.
#[derive(Debug, PartialEq, Eq)]
struct OtlpTarget {
    endpoint: String,
    /// Set for `https` collectors.
    tls_domain: Option<String>,
}

impl OtlpTarget {
    /// A bare `host:port` is treated as an `https` collector.
    fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim().trim_end_matches('/');
        let endpoint = if raw.contains("://") {
            raw.to_string()
        } else {
            format!("https://{raw}")
        };

        let url = Url::parse(&endpoint)
            .with_context(|| format!("invalid {OTLP_ENDPOINT_ENV}: {raw}"))?;
        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| anyhow!("{OTLP_ENDPOINT_ENV} must include a host: {raw}"))?;

        let tls_domain = match url.scheme() {
            "https" => Some(host.to_string()),
            "http" => None,
            other => return Err(anyhow!("unsupported OTLP scheme: {other}")),
        };

        Ok(Self {
            endpoint,
            tls_domain,
        })
    }
}

fn resource() -> Resource {
    let instance_id = var("OTEL_SERVICE_INSTANCE_ID").unwrap_or_else(|_| Ulid::new().to_string());
    Resource::new(vec![
        KeyValue::new("service.name", env!("CARGO_PKG_NAME")),
        KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
        KeyValue::new("service.instance.id", instance_id),
        KeyValue::new("vcs.revision", crate::GIT_COMMIT_HASH),
    ])
}

// The tonic exporter merges OTEL_EXPORTER_OTLP_HEADERS into the request metadata.
fn init_tracer(target: &OtlpTarget) -> Result<Tracer> {
    let mut builder = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(target.endpoint.clone())
        .with_timeout(EXPORT_TIMEOUT);

    if let Some(domain) = &target.tls_domain {
        builder = builder.with_tls_config(
            ClientTlsConfig::new()
                .domain_name(domain.clone())
                .with_native_roots(),
        );
    }

    let provider = TracerProvider::builder()
        .with_batch_exporter(builder.build()?, runtime::Tokio)
        .with_resource(resource())
        .build();

    global::set_tracer_provider(provider.clone());
    let tracer = provider.tracer(env!("CARGO_PKG_NAME"));
    let _ = TRACER_PROVIDER.set(provider);

    Ok(tracer)
}

/// Install the global subscriber. Spans are also exported over OTLP/gRPC when
/// `OTEL_EXPORTER_OTLP_ENDPOINT` is set.
///
/// # Errors
///
/// Returns an error for an invalid log directive, an unusable OTLP endpoint, or
/// if a global subscriber is already installed.
pub fn init(settings: &LogSettings) -> Result<()> {
    let filter = log_filter(settings)?;

    let fmt_layer = fmt::layer().with_target(false).pretty();

    let otel_layer = match var(OTLP_ENDPOINT_ENV) {
        Ok(raw) => {
            let target = OtlpTarget::parse(&raw)?;
            let tracer = init_tracer(&target)?;
            Some(tracing_opentelemetry::layer().with_tracer(tracer))
        }
        Err(_) => None,
    };

    let subscriber = Registry::default()
        .with(fmt_layer)
        .with(otel_layer)
        .with(filter);
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

/// Flush pending spans. Does nothing if the exporter never started.
pub fn shutdown_tracer() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        debug!("shutting down tracer provider");
        let _ = provider.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(level: Option<Level>, directives: Option<&str>) -> LogSettings {
        LogSettings {
            level,
            directives: directives.map(str::to_string),
        }
    }

    #[test]
    fn filter_defaults_to_errors_with_quiet_floors() -> Result<()> {
        let rendered = log_filter(&LogSettings::default())?.to_string();
        assert!(rendered.contains("error"), "{rendered}");
        for directive in QUIET_TARGETS {
            assert!(rendered.contains(directive), "missing {directive} in {rendered}");
        }
        Ok(())
    }

    #[test]
    fn filter_lets_directives_lift_quiet_targets() -> Result<()> {
        let rendered = log_filter(&settings(
            Some(Level::INFO),
            Some("sqlx::query=debug, tower_http=debug"),
        ))?
        .to_string();
        assert!(rendered.contains("sqlx::query=debug"), "{rendered}");
        assert!(!rendered.contains("sqlx::query=warn"), "{rendered}");
        assert!(rendered.contains("tower_http=debug"), "{rendered}");
        Ok(())
    }

    #[test]
    fn filter_rejects_bad_directive() {
        let result = log_filter(&settings(None, Some("keyward=loud")));
        assert!(result
            .err()
            .is_some_and(|err| err.to_string().contains("keyward=loud")));
    }

    #[test]
    fn otlp_target_plain_http() -> Result<()> {
        assert_eq!(
            OtlpTarget::parse("http://collector:4317/")?,
            OtlpTarget {
                endpoint: "http://collector:4317".to_string(),
                tls_domain: None,
            }
        );
        Ok(())
    }

    #[test]
    fn otlp_target_defaults_to_https() -> Result<()> {
        assert_eq!(
            OtlpTarget::parse(" otel.keyward.dev:4317 ")?,
            OtlpTarget {
                endpoint: "https://otel.keyward.dev:4317".to_string(),
                tls_domain: Some("otel.keyward.dev".to_string()),
            }
        );
        Ok(())
    }

    #[test]
    fn otlp_target_rejects_bad_endpoints() {
        assert!(OtlpTarget::parse("bad host:4317").is_err());
        assert!(OtlpTarget::parse("ftp://collector:4317").is_err());
    }

    #[test]
    fn shutdown_tracer_without_provider() {
        shutdown_tracer();
    }
}
