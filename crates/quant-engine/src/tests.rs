#[cfg(test)]
mod quant_engine_tests {
    use crate::format::fmt_kpi_value;
    use crate::kpi::EXTRACTION_NOTE;
    use crate::monitor::{check_kill_criteria, KillStatus};
    use crate::supplement::{kpis_needing_extraction, Confidence, ExtractedKpi, FilingReference};
    use crate::QuantEngine;
    use approx::assert_relative_eq;
    use async_trait::async_trait;
    use brief_core::{
        BriefError, CompanyFacts, FactEntry, FactField, FactSet, FactsProvider, FiscalPeriod, KpiId,
        Quote, QuoteProvider, RiskFreeRate, RiskFreeRateProvider, ScoreKind, SectorTemplate,
    };
    use chrono::NaiveDate;
    use std::sync::Arc;

    struct StaticFacts(CompanyFacts);

    #[async_trait]
    impl FactsProvider for StaticFacts {
        async fn company_facts(&self, _ticker: &str) -> Result<CompanyFacts, BriefError> {
            Ok(self.0.clone())
        }
    }

    struct FailingFacts;

    #[async_trait]
    impl FactsProvider for FailingFacts {
        async fn company_facts(&self, ticker: &str) -> Result<CompanyFacts, BriefError> {
            Err(BriefError::ApiError(format!("HTTP 503: no facts for {}", ticker)))
        }
    }

    struct StaticQuote(Option<f64>);

    #[async_trait]
    impl QuoteProvider for StaticQuote {
        async fn quote(&self, _ticker: &str) -> Result<Quote, BriefError> {
            Ok(Quote {
                price: self.0,
                currency: "USD".to_string(),
            })
        }
    }

    struct StaticRate(f64);

    #[async_trait]
    impl RiskFreeRateProvider for StaticRate {
        async fn risk_free_rate(&self) -> Result<RiskFreeRate, BriefError> {
            Ok(RiskFreeRate {
                ten_year: self.0,
                as_of: NaiveDate::from_ymd_opt(2025, 9, 30),
            })
        }
    }

    fn entry(year: i32, fp: FiscalPeriod, value: f64, form: &str) -> FactEntry {
        let month = match fp {
            FiscalPeriod::Q1 => 4,
            FiscalPeriod::Q2 => 7,
            FiscalPeriod::Q3 => 10,
            FiscalPeriod::FY => 1,
        };
        let period_end = NaiveDate::from_ymd_opt(year, month, 26).unwrap();
        FactEntry {
            value,
            period_start: NaiveDate::from_ymd_opt(year - 1, 1, 29),
            period_end,
            fiscal_year: year,
            fiscal_period: fp,
            form: form.to_string(),
            accession: format!("0001045810-{}-0000{}", year % 100, month),
            filed: period_end + chrono::Duration::days(30),
            concept: Some("Revenues".to_string()),
        }
    }

    fn annual(current: f64, prior: f64) -> Vec<FactEntry> {
        vec![
            entry(2025, FiscalPeriod::FY, current, "10-K"),
            entry(2024, FiscalPeriod::FY, prior, "10-K"),
        ]
    }

    fn semis_company() -> CompanyFacts {
        let facts = FactSet::new()
            .with_series(FactField::Revenue, annual(120e9, 100e9))
            .with_series(FactField::CostOfRevenue, annual(60e9, 60e9))
            .with_series(FactField::OperatingCashFlow, annual(50e9, 35e9))
            .with_series(FactField::Capex, annual(20e9, 15e9))
            .with_series(FactField::SharesOutstanding, annual(2e9, 2.1e9))
            .with_series(FactField::LongTermDebt, annual(10e9, 12e9))
            .with_series(FactField::CashAndEquivalents, annual(20e9, 15e9))
            .with_series(FactField::Inventory, annual(10e9, 8e9))
            .with_series(FactField::TotalAssets, annual(200e9, 180e9))
            .with_series(FactField::NetIncome, annual(40e9, 30e9))
            .with_series(FactField::ResearchAndDevelopment, annual(12e9, 10e9));

        let quarterly = FactSet::new()
            .with_series(
                FactField::Revenue,
                vec![
                    entry(2026, FiscalPeriod::Q1, 30e9, "10-Q"),
                    entry(2026, FiscalPeriod::Q2, 65e9, "10-Q"),
                    entry(2025, FiscalPeriod::Q1, 25e9, "10-Q"),
                    entry(2025, FiscalPeriod::Q2, 52e9, "10-Q"),
                ],
            )
            .with_series(
                FactField::ResearchAndDevelopment,
                vec![
                    entry(2026, FiscalPeriod::Q1, 3e9, "10-Q"),
                    entry(2026, FiscalPeriod::Q2, 6.5e9, "10-Q"),
                ],
            );

        CompanyFacts {
            entity_name: "NVIDIA CORP".to_string(),
            cik: "0001045810".to_string(),
            facts,
            quarterly,
        }
    }

    fn engine(facts: CompanyFacts, price: Option<f64>) -> QuantEngine {
        QuantEngine::new(
            Arc::new(StaticFacts(facts)),
            Arc::new(StaticQuote(price)),
            Arc::new(StaticRate(0.0425)),
        )
    }

    #[tokio::test]
    async fn test_analyze_semis_template() {
        let template = SectorTemplate::semis();
        let output = engine(semis_company(), Some(150.0))
            .analyze(" nvda ", &template)
            .await
            .unwrap();

        assert_eq!(output.ticker, "NVDA");
        assert_eq!(output.entity_name, "NVIDIA CORP");
        assert_eq!(output.template_name, "Semiconductors");

        // every template KPI is present, computable or not
        for def in &template.primary_kpis {
            assert!(output.sector_kpis.contains_key(&def.id), "{} missing", def.id);
        }
        assert_eq!(output.kpi_value(KpiId::GrossMargin), Some(50.0));
        assert_eq!(output.kpi_value(KpiId::RevenueGrowth), Some(20.0));
        assert_eq!(output.kpi_value(KpiId::InventoryDays), Some(60.8));
        assert_eq!(output.kpi_value(KpiId::CapexIntensity), Some(16.67));

        let backlog = &output.sector_kpis[&KpiId::Backlog];
        assert!(backlog.value.is_none());
        assert_eq!(backlog.note.as_deref(), Some(EXTRACTION_NOTE));

        // standalone Q2 FY2026 R&D 3.5 over revenue 35
        let rnd = &output.sector_kpis[&KpiId::RAndDIntensity];
        assert_eq!(rnd.qoq_value, Some(10.0));
        assert_eq!(rnd.qoq_period.as_deref(), Some("Q2 FY2026"));

        // Q2 growth 35 vs 27, Q1 growth 30 vs 25
        let growth = &output.sector_kpis[&KpiId::RevenueGrowth];
        assert_eq!(growth.qoq_value, Some(29.63));
        assert_eq!(growth.qoq_prior, Some(20.0));

        assert!(output.quality_scores.contains_key(&ScoreKind::PiotroskiF));
        assert!(output.quality_scores.contains_key(&ScoreKind::BeneishM));
        assert!(output.excluded_scores[&ScoreKind::AltmanZ].starts_with("Working capital"));
    }

    #[tokio::test]
    async fn test_ev_and_market_implied_are_consistent() {
        let output = engine(semis_company(), Some(150.0))
            .analyze("NVDA", &SectorTemplate::semis())
            .await
            .unwrap();

        let ev = &output.ev_build;
        assert_relative_eq!(ev.market_cap.value, 300e9);
        assert_relative_eq!(ev.enterprise_value, 290e9);
        assert_relative_eq!(
            ev.enterprise_value,
            ev.market_cap.value + ev.total_debt.value - ev.cash.value
        );

        let implied = output.market_implied.as_ref().expect("OCF and capex present");
        assert_relative_eq!(implied.ev_used, ev.enterprise_value);
        assert_relative_eq!(implied.fcf_used, 30e9);
        assert_relative_eq!(implied.wacc, 0.0875, epsilon = 1e-12);
        let g = implied.implied_fcf_growth_10yr.expect("solvable");
        assert!((-0.30..=0.60).contains(&g));
        assert_eq!(implied.sensitivity.len(), 2);
    }

    #[tokio::test]
    async fn test_saas_template_excludes_piotroski() {
        let template = SectorTemplate::saas();
        let output = engine(semis_company(), Some(150.0))
            .analyze("NVDA", &template)
            .await
            .unwrap();

        assert_eq!(output.quality_scores.len(), 1);
        assert!(output.quality_scores.contains_key(&ScoreKind::BeneishM));
        assert_eq!(output.excluded_scores.len(), 3);
        assert!(output.excluded_scores.contains_key(&ScoreKind::PiotroskiF));
        assert_eq!(output.kpi_value(KpiId::FcfMargin), Some(25.0));
        assert_eq!(output.kpi_value(KpiId::RuleOf40), Some(45.0));
    }

    #[tokio::test]
    async fn test_missing_quote_still_produces_output() {
        let output = engine(semis_company(), None)
            .analyze("NVDA", &SectorTemplate::semis())
            .await
            .unwrap();

        assert_eq!(output.ev_build.market_cap.computation, "unavailable");
        assert_relative_eq!(output.ev_build.enterprise_value, -10e9);
        // EV below any reachable DCF value
        let implied = output.market_implied.unwrap();
        assert!(implied.implied_fcf_growth_10yr.is_none());
    }

    #[tokio::test]
    async fn test_upstream_failure_propagates() {
        let engine = QuantEngine::new(
            Arc::new(FailingFacts),
            Arc::new(StaticQuote(Some(10.0))),
            Arc::new(StaticRate(0.04)),
        );

        let err = engine.analyze("ACME", &SectorTemplate::saas()).await.unwrap_err();
        assert!(matches!(err, BriefError::ApiError(_)));
    }

    #[tokio::test]
    async fn test_empty_ticker_is_rejected() {
        let err = engine(semis_company(), Some(1.0))
            .analyze("  ", &SectorTemplate::saas())
            .await
            .unwrap_err();
        assert!(matches!(err, BriefError::InvalidData(_)));
    }

    #[tokio::test]
    async fn test_empty_facts_yield_absent_values_not_errors() {
        let empty = CompanyFacts {
            entity_name: "Shell Co".to_string(),
            cik: "0000000001".to_string(),
            ..CompanyFacts::default()
        };
        let output = engine(empty, Some(5.0))
            .analyze("SHEL", &SectorTemplate::semis())
            .await
            .unwrap();

        assert!(output.market_implied.is_none());
        assert!(output.sector_kpis.values().all(|k| k.value.is_none()));
        assert_eq!(output.quality_scores[&ScoreKind::PiotroskiF].value, 0.0);
        assert_eq!(
            fmt_kpi_value(output.kpi_value(KpiId::GrossMargin), brief_core::KpiUnit::Percent),
            "N/A"
        );
    }

    #[tokio::test]
    async fn test_concurrent_analyses_are_independent() {
        let engine = engine(semis_company(), Some(150.0));
        let saas = SectorTemplate::saas();
        let semis = SectorTemplate::semis();

        let (a, b) = tokio::join!(engine.analyze("nvda", &saas), engine.analyze("amd", &semis));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(a.ticker, "NVDA");
        assert_eq!(b.ticker, "AMD");
        assert_eq!(a.template_name, "SaaS / Cloud Software");
        assert_eq!(b.template_name, "Semiconductors");
    }

    #[tokio::test]
    async fn test_supplements_fill_only_missing_values() {
        let template = SectorTemplate::saas();
        let mut output = engine(semis_company(), Some(150.0))
            .analyze("NVDA", &template)
            .await
            .unwrap();

        let requests = kpis_needing_extraction(&template, &output);
        let ids: Vec<_> = requests.iter().map(|r| r.kpi_id).collect();
        assert_eq!(ids, vec![KpiId::Nrr, KpiId::CacPayback]);

        let filing = FilingReference {
            form_type: "10-K".to_string(),
            accession_number: "0001045810-25-000023".to_string(),
            filing_date: NaiveDate::from_ymd_opt(2025, 2, 26),
            url: None,
        };
        let extracted = vec![
            ExtractedKpi {
                kpi_id: KpiId::Nrr,
                value: 112.0,
                period: Some("FY2025".to_string()),
                confidence: Confidence::High,
                exact_quote: "Net revenue retention was 112%".to_string(),
                note: None,
            },
            // computed from XBRL already
            ExtractedKpi {
                kpi_id: KpiId::RevenueGrowth,
                value: 99.0,
                period: None,
                confidence: Confidence::Low,
                exact_quote: String::new(),
                note: None,
            },
            // not part of the SaaS template
            ExtractedKpi {
                kpi_id: KpiId::BookToBill,
                value: 1.1,
                period: None,
                confidence: Confidence::Medium,
                exact_quote: String::new(),
                note: None,
            },
        ];

        assert_eq!(output.apply_supplements(&template, &filing, &extracted), 1);

        let nrr = &output.sector_kpis[&KpiId::Nrr];
        assert_eq!(nrr.value, Some(112.0));
        assert_eq!(nrr.label, "Net Revenue Retention");
        assert_eq!(nrr.note.as_deref(), Some("Extracted from filing (high confidence)"));
        assert_eq!(
            nrr.computation.as_deref(),
            Some("LLM extraction: \"Net revenue retention was 112%\"")
        );
        assert_eq!(output.kpi_value(KpiId::RevenueGrowth), Some(20.0));
        assert!(!output.sector_kpis.contains_key(&KpiId::BookToBill));

        let remaining = kpis_needing_extraction(&template, &output);
        assert_eq!(remaining.len(), 1);
    }

    #[tokio::test]
    async fn test_default_kill_criteria() {
        let template = SectorTemplate::saas();
        let output = engine(semis_company(), Some(150.0))
            .analyze("NVDA", &template)
            .await
            .unwrap();

        let checks = check_kill_criteria(&template.default_kill_criteria, &output);
        assert_eq!(checks.len(), 4);
        // NRR needs filing text
        assert_eq!(checks[0].status, KillStatus::NoData);
        // rule of 40 at 45 vs a 25 floor
        assert_eq!(checks[3].status, KillStatus::Ok);
        assert_eq!(checks[3].distance_pct, Some(80.0));
    }

    #[tokio::test]
    async fn test_output_serializes_absent_values_as_null() {
        let output = engine(semis_company(), None)
            .analyze("NVDA", &SectorTemplate::semis())
            .await
            .unwrap();

        let json = serde_json::to_value(&output).unwrap();
        assert!(json["market_implied"]["implied_fcf_growth_10yr"].is_null());
        assert!(json["sector_kpis"]["backlog"]["value"].is_null());
        assert_eq!(json["sector_kpis"]["gross_margin"]["unit"], "%");
        assert!(json["quality_scores"]["piotroski_f"]["value"].is_number());
    }
}
