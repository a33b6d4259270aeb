//! Case runner that owns the service client, browser and artifact access

use std::path::PathBuf;
use std::time::Instant;

use docfactory_qa_common::{DensityPolicy, GateKind, GateMarkers, RuleTable};
use tracing::{debug, error, info, warn};

use crate::artifacts::ArtifactResolver;
use crate::client::{DocService, HttpTransport};
use crate::config::QaConfig;
use crate::error::{QaError, QaResult};
use crate::fixtures::Fixtures;
use crate::playwright::{BrowserInspector, PageInspector};
use crate::report::{CaseReport, Report};
use crate::scan::SourceScanner;
use crate::scenarios::ScenarioContext;
use crate::spec::CaseSpec;

/// Runs cases one after another against one service.
pub struct CaseRunner {
    service: Box<dyn DocService>,
    inspector: Box<dyn PageInspector>,
    artifacts: ArtifactResolver,
    fixtures: Fixtures,
    scanner: SourceScanner,
    markers: GateMarkers,
    density: DensityPolicy,
    internal_terms: RuleTable,
    domain_copy: RuleTable,
    output_dir: PathBuf,
}

impl CaseRunner {
    /// HTTP transport and Playwright inspector built from `config`.
    pub fn from_config(config: &QaConfig) -> QaResult<Self> {
        config.validate()?;
        let service = HttpTransport::new(&config.service)?;
        let inspector = BrowserInspector::from_config(config)?;
        Self::with_parts(config, Box::new(service), Box::new(inspector))
    }

    /// Runner over caller-supplied service and inspector.
    pub fn with_parts(
        config: &QaConfig,
        service: Box<dyn DocService>,
        inspector: Box<dyn PageInspector>,
    ) -> QaResult<Self> {
        Ok(Self {
            service,
            inspector,
            artifacts: ArtifactResolver::from_config(config),
            fixtures: Fixtures::from_config(config),
            scanner: SourceScanner::new(
                config.paths.root.clone(),
                config.scan_roots(),
                &config.paths.scan_extensions,
            ),
            markers: config.markers.clone(),
            density: config.density,
            internal_terms: config.rules.internal_terms()?,
            domain_copy: config.rules.domain_copy()?,
            output_dir: config.output_dir().to_path_buf(),
        })
    }

    pub fn base_url(&self) -> &str {
        self.service.base_url()
    }

    fn context(&self) -> ScenarioContext<'_> {
        ScenarioContext {
            service: self.service.as_ref(),
            inspector: self.inspector.as_ref(),
            artifacts: &self.artifacts,
            fixtures: &self.fixtures,
            scanner: &self.scanner,
            markers: &self.markers,
            density: &self.density,
            internal_terms: &self.internal_terms,
            domain_copy: &self.domain_copy,
        }
    }

    /// Run one case. Faults become part of the report, never an error.
    pub async fn run_case(&self, spec: &CaseSpec) -> CaseReport {
        let start = Instant::now();
        debug!("Running case: {}", spec.name);

        let outcome = self.context().run(&spec.scenario).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(verdict) => CaseReport::from_verdict(&spec.name, verdict, duration_ms),
            Err(e) => {
                if e.is_transport_fault() {
                    warn!(case = %spec.name, error = %e, "Case aborted by transport fault");
                }
                CaseReport::from_fault(&spec.name, spec.gate(), e.to_string(), duration_ms)
            }
        }
    }

    /// Run `specs` in order.
    pub async fn run_specs(&self, specs: &[&CaseSpec]) -> Report {
        let start = Instant::now();
        let mut results = Vec::with_capacity(specs.len());

        info!("Running {} case(s) against {}...", specs.len(), self.base_url());

        for spec in specs {
            let result = self.run_case(spec).await;
            if result.passed {
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                error!("✗ {} - {}", result.name, result.failure_summary());
            }
            results.push(result);
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        let report = Report::new(self.base_url(), results, duration_ms);

        info!(
            "Results: {} passed, {} failed ({} ms)",
            report.passed_count, report.failed_count, duration_ms
        );
        report
    }

    /// Run every spec, or only those for `gate`.
    pub async fn run_selected(&self, specs: &[CaseSpec], gate: Option<GateKind>) -> QaResult<Report> {
        let selected: Vec<&CaseSpec> = match gate {
            Some(gate) => CaseSpec::filter_by_gate(specs, gate),
            None => specs.iter().collect(),
        };
        if selected.is_empty() {
            return Err(QaError::CaseNotFound(
                gate.map(|g| g.to_string()).unwrap_or_else(|| "any gate".to_string()),
            ));
        }
        Ok(self.run_specs(&selected).await)
    }

    /// Write the report into the configured output directory.
    pub fn write_report(&self, report: &Report) -> QaResult<PathBuf> {
        report.write(&self.output_dir)
    }
}
