use crate::infra::OfflineNarrator;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use taicc_readiness::error::AppError;
use taicc_readiness::workflows::assessment::catalog::{segment_explanation, tier_explanation};
use taicc_readiness::workflows::assessment::report::REPORT_FILE_NAME;
use taicc_readiness::workflows::assessment::{
    AssessmentService, CsvRowSink, LoginSubmission, QuestionCatalog, Rating, SystemClock,
};

const DEFAULT_QUESTIONS: &str = "data/questions.json";

#[derive(Args, Debug)]
pub(crate) struct CatalogArgs {
    /// Question catalog to inspect
    #[arg(long, default_value = DEFAULT_QUESTIONS)]
    pub(crate) questions: PathBuf,
    /// Print the catalog summary as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Industry segment to answer for
    #[arg(long, default_value = "Healthcare")]
    pub(crate) segment: String,
    /// Organizational tier to answer for
    #[arg(long, default_value = "Tier 3")]
    pub(crate) tier: String,
    /// Rating applied to every question
    #[arg(long, default_value = "Moderately", value_parser = parse_rating)]
    pub(crate) rating: Rating,
    /// Company name printed on the report
    #[arg(long, default_value = "TAICC Demo Co")]
    pub(crate) company: String,
    /// Where to write the PDF report
    #[arg(long, default_value = REPORT_FILE_NAME)]
    pub(crate) output: PathBuf,
    /// Question catalog to load
    #[arg(long, default_value = DEFAULT_QUESTIONS)]
    pub(crate) questions: PathBuf,
}

fn parse_rating(value: &str) -> Result<Rating, String> {
    Rating::from_label(value).ok_or_else(|| {
        let labels: Vec<&str> = Rating::ordered().iter().map(|rating| rating.label()).collect();
        format!("expected one of: {}", labels.join(", "))
    })
}

pub(crate) fn run_catalog(args: CatalogArgs) -> Result<(), AppError> {
    let catalog = QuestionCatalog::from_path(&args.questions)?;
    let summary = catalog.summary();

    if args.json {
        let json = serde_json::to_string_pretty(&summary).map_err(std::io::Error::from)?;
        println!("{json}");
        return Ok(());
    }

    println!("Question catalog: {}", args.questions.display());
    println!("Segments:");
    for segment in catalog.segments() {
        let counts: Vec<String> = catalog
            .tiers()
            .filter_map(|tier| {
                let questions = catalog.questions(segment, tier).ok()?;
                Some(format!("{tier}: {}", questions.len()))
            })
            .collect();
        println!("  - {segment} ({})", counts.join(", "));
        if let Some(explanation) = segment_explanation(segment) {
            println!("      {explanation}");
        }
    }
    println!("Tiers:");
    for tier in catalog.tiers() {
        match tier_explanation(tier) {
            Some(explanation) => println!("  - {tier} - {explanation}"),
            None => println!("  - {tier}"),
        }
    }
    Ok(())
}

/// Offline end-to-end run. Blocks; call from the blocking pool.
pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        segment,
        tier,
        rating,
        company,
        output,
        questions,
    } = args;

    let catalog = Arc::new(QuestionCatalog::from_path(&questions)?);
    let total = catalog.questions(&segment, &tier)?.len();
    let service = AssessmentService::new(
        catalog,
        Arc::new(OfflineNarrator),
        Arc::new(CsvRowSink::new(std::io::stdout())),
        Arc::new(SystemClock),
    );

    println!("TAICC AI readiness demo");
    println!("- Segment: {segment} | Tier: {tier} | {total} questions answered '{rating}'");

    let mut session = service.start_session();
    service.submit_login(
        &mut session,
        LoginSubmission {
            name: "Demo Respondent".to_string(),
            company,
            email: "demo@taicc.example".to_string(),
            phone: String::new(),
            segment,
            tier,
        },
    )?;
    let answers: Vec<(usize, Rating)> = (0..total).map(|index| (index, rating)).collect();
    service.submit_answers(&mut session, &answers)?;

    println!("Result row (CSV):");
    let results = service.results(&mut session)?;
    println!("- Average score: {:.2}", results.average);
    println!(
        "- Maturity level: {} ({})",
        results.maturity.label(),
        results.maturity.description()
    );
    println!("- Time taken: {}", results.elapsed_label());
    if let Some(warning) = &results.spreadsheet_warning {
        println!("- Result row not recorded: {warning}");
    }

    std::fs::write(&output, &results.report_pdf)?;
    println!(
        "- PDF report ({} bytes) written to {}",
        results.report_pdf.len(),
        output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn catalog_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(
            br#"{"BFSI": {"Tier 3": ["Is fraud detection automated?", "Do you score credit with ML?"]}}"#,
        )
        .expect("catalog written");
        file
    }

    #[test]
    fn demo_writes_a_pdf_report() {
        let catalog = catalog_file();
        let dir = tempfile::tempdir().expect("temp dir");
        let output = dir.path().join("report.pdf");

        run_demo(DemoArgs {
            segment: "BFSI".to_string(),
            tier: "Tier 3".to_string(),
            rating: Rating::Very,
            company: "Acme Finance".to_string(),
            output: output.clone(),
            questions: catalog.path().to_path_buf(),
        })
        .expect("demo runs");

        let bytes = std::fs::read(&output).expect("pdf written");
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn demo_rejects_unknown_tiers() {
        let catalog = catalog_file();
        let err = run_demo(DemoArgs {
            segment: "BFSI".to_string(),
            tier: "Tier 9".to_string(),
            rating: Rating::Very,
            company: "Acme Finance".to_string(),
            output: PathBuf::from("unused.pdf"),
            questions: catalog.path().to_path_buf(),
        })
        .expect_err("unknown tier");

        assert!(matches!(err, AppError::Catalog(_)));
    }

    #[test]
    fn rating_parser_lists_valid_labels() {
        let err = parse_rating("Somewhat").expect_err("invalid");
        assert!(err.contains("Not at all"));
        assert_eq!(parse_rating("fully"), Ok(Rating::Fully));
    }
}
