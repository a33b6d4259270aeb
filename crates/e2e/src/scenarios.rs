//! Scenario sequencing
//!
//! Each gate has one scenario: a fixed sequence of trigger, export, artifact
//! and browser steps that fills the gate's observation record, then hands it
//! to the verifier. Steps run strictly in order; any transport fault aborts
//! the scenario with an error and no verdict.

use docfactory_qa_common::artifact::{Absence, Layout, Resolved};
use docfactory_qa_common::gates::{
    completeness, copy_density, determinism, domain_copy, export_size, internal_terms, isolation, layout_density,
    reference_freshness, reference_source, ui_runtime, variant,
};
use docfactory_qa_common::{
    DensityPolicy, ExportRequest, ExportResponse, GateMarkers, PageSize, RuleTable, TriggerQuery, Verdict,
};
use tracing::{debug, info, warn};

use crate::artifacts::ArtifactResolver;
use crate::client::{service_url, DocService};
use crate::error::QaResult;
use crate::fixtures::Fixtures;
use crate::playwright::{InspectOptions, PageInspector};
use crate::scan::SourceScanner;
use crate::spec::{Scenario, TestCase};

/// Everything a scenario may touch. Borrowed for the duration of one case.
pub struct ScenarioContext<'a> {
    pub service: &'a dyn DocService,
    pub inspector: &'a dyn PageInspector,
    pub artifacts: &'a ArtifactResolver,
    pub fixtures: &'a Fixtures,
    pub scanner: &'a SourceScanner,
    pub markers: &'a GateMarkers,
    pub density: &'a DensityPolicy,
    pub internal_terms: &'a RuleTable,
    pub domain_copy: &'a RuleTable,
}

async fn export(service: &dyn DocService, request: &ExportRequest) -> QaResult<ExportResponse> {
    Ok(service.export(request).await?.into_response())
}

/// Layout for the hash a response reported, if it reported one.
fn layout_for(artifacts: &ArtifactResolver, response: &ExportResponse) -> Resolved<Layout> {
    match response.request_hash() {
        Some(hash) => artifacts.layout(hash),
        None => Resolved::Absent(Absence::Missing {
            path: format!("{}/<no request hash in response>", artifacts.job_root().display()),
        }),
    }
}

impl<'a> ScenarioContext<'a> {
    /// Run `scenario` and verify what it observed.
    pub async fn run(&self, scenario: &Scenario) -> QaResult<Verdict> {
        if let Some(plan) = scenario.sample_images() {
            let count = self.fixtures.ensure_sample_images(&plan)?;
            debug!(count, prefix = plan.prefix, "Sample images ready");
        }

        match scenario {
            Scenario::Determinism { case } => self.determinism(case).await,
            Scenario::VariantSensitivity {
                case,
                alternate_variant,
            } => self.variant_sensitivity(case, *alternate_variant).await,
            Scenario::JobIsolation { first, second } => self.job_isolation(first, second).await,
            Scenario::ContentCompleteness { case } => self.content_completeness(case).await,
            Scenario::CopyDensity { case, thresholds } => self.copy_density(case, thresholds).await,
            Scenario::LayoutDensity {
                case,
                min_pages,
                policy,
            } => {
                self.layout_density(case, *min_pages, policy.as_ref().unwrap_or(self.density))
                    .await
            }
            Scenario::InternalTerms { case } => self.internal_terms(case).await,
            Scenario::ReferenceSource { case } => self.reference_source(case).await,
            Scenario::ReferenceFreshness {
                case,
                stale_variant,
                rebuild_variant,
            } => self.reference_freshness(case, *stale_variant, *rebuild_variant).await,
            Scenario::ExportSize { case, blocked_size } => self.export_size(case, blocked_size).await,
            Scenario::UiRuntime {
                variant,
                blocked_size,
                expect_quality,
            } => self.ui_runtime(*variant, blocked_size, *expect_quality).await,
            Scenario::DomainCopy => Ok(self.domain_copy()),
        }
    }

    async fn determinism(&self, case: &TestCase) -> QaResult<Verdict> {
        self.service.trigger(&case.to_trigger_query()).await?;
        let request = case.to_export_request();
        let first = export(self.service, &request).await?;
        let second = export(self.service, &request).await?;
        Ok(determinism::verify(&determinism::DeterminismObservation { first, second }))
    }

    async fn variant_sensitivity(&self, case: &TestCase, alternate_variant: u32) -> QaResult<Verdict> {
        self.service.trigger(&case.to_trigger_query()).await?;
        let request = case.to_export_request();
        let base = export(self.service, &request).await?;
        let repeat = export(self.service, &request).await?;
        let alternate = export(self.service, &request.clone().with_variant(alternate_variant)).await?;
        Ok(variant::verify(&variant::VariantObservation {
            base_variant: case.variant,
            alternate_variant,
            base,
            repeat,
            alternate,
        }))
    }

    async fn job_isolation(&self, first_case: &TestCase, second_case: &TestCase) -> QaResult<Verdict> {
        self.service.trigger(&first_case.to_trigger_query()).await?;
        let first = export(self.service, &first_case.to_export_request()).await?;
        let first_hash = first.request_hash().unwrap_or_default().to_string();
        let first_before = self.artifacts.digests(&first_hash);
        debug!(hash = %first_hash, complete = first_before.complete(), "Recorded first job digests");

        self.service.trigger(&second_case.to_trigger_query()).await?;
        let second = export(self.service, &second_case.to_export_request()).await?;
        let second_hash = second.request_hash().unwrap_or_default().to_string();

        let observation = isolation::IsolationObservation {
            first_after: self.artifacts.digests(&first_hash),
            second_digests: self.artifacts.digests(&second_hash),
            first_layout: layout_for(self.artifacts, &first),
            second_layout: layout_for(self.artifacts, &second),
            first_before,
            first,
            second,
        };
        Ok(isolation::verify(&observation))
    }

    async fn content_completeness(&self, case: &TestCase) -> QaResult<Verdict> {
        self.service.trigger(&case.to_trigger_query()).await?;
        let response = export(self.service, &case.to_export_request()).await?;
        let layout = layout_for(self.artifacts, &response);
        Ok(completeness::verify(
            &completeness::CompletenessObservation { response, layout },
            self.markers,
        ))
    }

    async fn copy_density(
        &self,
        case: &TestCase,
        thresholds: &copy_density::CopyDensityThresholds,
    ) -> QaResult<Verdict> {
        let response = export(self.service, &case.to_export_request()).await?;
        let layout = layout_for(self.artifacts, &response);
        Ok(copy_density::verify(
            &copy_density::CopyDensityObservation { response, layout },
            thresholds,
        ))
    }

    async fn layout_density(&self, case: &TestCase, min_pages: usize, policy: &DensityPolicy) -> QaResult<Verdict> {
        let before = self.artifacts.latest_job();
        self.service.trigger(&case.to_trigger_query()).await?;
        let after = self.artifacts.latest_job();

        if after.is_some() && after == before {
            warn!("No job directory newer than before the trigger; reading the latest one");
        }

        let request_hash = after.map(|(hash, _)| hash);
        let layout = match &request_hash {
            Some(hash) => self.artifacts.layout(hash),
            None => Resolved::Absent(Absence::Missing {
                path: self.artifacts.job_root().display().to_string(),
            }),
        };
        info!(request_hash = request_hash.as_deref().unwrap_or("-"), "Density layout selected");

        Ok(layout_density::verify(
            &layout_density::LayoutDensityObservation { request_hash, layout },
            policy,
            min_pages,
            self.markers,
        ))
    }

    async fn internal_terms(&self, case: &TestCase) -> QaResult<Verdict> {
        self.service.trigger(&case.to_trigger_query()).await?;
        let response = export(self.service, &case.to_export_request()).await?;
        let layout = layout_for(self.artifacts, &response);
        Ok(internal_terms::verify(
            &internal_terms::InternalTermsObservation { response, layout },
            self.internal_terms,
            self.markers,
        ))
    }

    async fn reference_source(&self, case: &TestCase) -> QaResult<Verdict> {
        self.service.trigger(&case.to_trigger_query()).await?;
        let request = case.to_export_request();
        let blocked = export(self.service, &request.clone().disable_reference_usage()).await?;
        let allowed = export(self.service, &request).await?;
        Ok(reference_source::verify(
            &reference_source::ReferenceSourceObservation { blocked, allowed },
            self.markers,
        ))
    }

    async fn reference_freshness(
        &self,
        case: &TestCase,
        stale_variant: u32,
        rebuild_variant: u32,
    ) -> QaResult<Verdict> {
        let request = case.to_export_request();

        self.service.trigger(&TriggerQuery::control_page(stale_variant, None)).await?;
        let index_before = self.artifacts.reference_index();

        let touched = self
            .fixtures
            .touch_first_reference()?
            .map(|path| path.display().to_string());
        let stale = export(self.service, &request).await?;

        self.service.trigger(&TriggerQuery::control_page(rebuild_variant, None)).await?;
        let rebuilt = export(self.service, &request).await?;
        let index_after = self.artifacts.reference_index();

        Ok(reference_freshness::verify(
            &reference_freshness::FreshnessObservation {
                touched,
                index_before,
                stale,
                rebuilt,
                index_after,
            },
            self.markers,
        ))
    }

    async fn export_size(&self, case: &TestCase, blocked_size: &PageSize) -> QaResult<Verdict> {
        let request = case.to_export_request();
        let normal = export(self.service, &request).await?;
        let blocked = export(self.service, &request.clone().with_page_size(blocked_size)).await?;
        Ok(export_size::verify(&export_size::ExportSizeObservation {
            normal_size: case.page_size.clone(),
            blocked_size: blocked_size.clone(),
            normal,
            blocked,
        }))
    }

    async fn ui_runtime(&self, variant: u32, blocked_size: &PageSize, expect_quality: bool) -> QaResult<Verdict> {
        let base_url = self.service.base_url();
        let normal_url = service_url(base_url, "/", &TriggerQuery::control_page(variant, None))?;
        let blocked_url = service_url(base_url, "/", &TriggerQuery::control_page(variant, Some(blocked_size)))?;

        let normal = self
            .inspector
            .inspect(
                normal_url.as_str(),
                &InspectOptions {
                    expect_quality,
                    screenshot_name: Some("ui-normal".to_string()),
                },
            )
            .await?;
        let blocked = self
            .inspector
            .inspect(
                blocked_url.as_str(),
                &InspectOptions {
                    expect_quality: false,
                    screenshot_name: Some("ui-blocked".to_string()),
                },
            )
            .await?;

        Ok(ui_runtime::verify(&ui_runtime::UiRuntimeObservation { normal, blocked }))
    }

    fn domain_copy(&self) -> Verdict {
        let summary = self.scanner.scan(self.domain_copy);
        info!(
            files = summary.files_scanned,
            findings = summary.findings.len(),
            "Scanned sources for sample copy"
        );
        domain_copy::verify(&summary)
    }
}
