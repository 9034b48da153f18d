use crate::infra::{controller_for, read_json_file, read_snapshot, LocationBackend};
use chrono::{NaiveDate, Utc};
use clap::Args;
use enrollment::config::AppConfig;
use enrollment::error::AppError;
use enrollment::workflows::enrollment::{
    format_size, hydrate, ContinueDecision, DashboardView, DocumentSlotId, DocumentStaging,
    DocumentStatus, FormReport, FormValidator, IncomingFile, MemorySessionStore, ReviewAssembler,
    ReviewProgress, ReviewView, SubmittedApplication,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ValidateArgs {
    /// Saved form snapshot (the `formData` session entry)
    pub(crate) snapshot: PathBuf,
    /// Evaluation date used to derive the learner's age (defaults to today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub(crate) struct ReviewArgs {
    /// Saved form snapshot (the `formData` session entry)
    pub(crate) snapshot: PathBuf,
    /// Document status summary (the `documentStatus` session entry)
    #[arg(long)]
    pub(crate) documents: Option<PathBuf>,
    /// Offline location registry CSV instead of the PSGC API
    #[arg(long)]
    pub(crate) registry: Option<PathBuf>,
    /// Treat the form step as completed
    #[arg(long)]
    pub(crate) form_completed: bool,
    /// Treat the terms and conditions as accepted
    #[arg(long)]
    pub(crate) terms_accepted: bool,
}

#[derive(Args, Debug)]
pub(crate) struct StageArgs {
    /// File to stage
    pub(crate) file: PathBuf,
    /// Target slot: birth-cert, report-card, id-photo or moral-cert
    #[arg(long, value_parser = parse_slot)]
    pub(crate) slot: DocumentSlotId,
    /// Write the staged session entry as JSON
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct DashboardArgs {
    /// Submitted application record (the `submittedApplication` session entry)
    pub(crate) submission: PathBuf,
}

fn parse_slot(raw: &str) -> Result<DocumentSlotId, String> {
    DocumentSlotId::from_id(raw.trim()).ok_or_else(|| {
        let known: Vec<&str> = DocumentSlotId::all().iter().map(|slot| slot.id()).collect();
        format!("unknown slot '{raw}' (expected one of {})", known.join(", "))
    })
}

pub(crate) fn run_validate(args: ValidateArgs) -> Result<(), AppError> {
    let snapshot = read_snapshot(&args.snapshot)?;
    let session = hydrate(&snapshot, &controller_for(args.today));
    let report = FormValidator::new().validate_form(&session);
    render_report(&report);
    Ok(())
}

pub(crate) async fn run_review(args: ReviewArgs) -> Result<(), AppError> {
    let ReviewArgs {
        snapshot,
        documents,
        registry,
        form_completed,
        terms_accepted,
    } = args;

    let config = AppConfig::load()?;
    let snapshot = read_snapshot(&snapshot)?;
    let documents: Option<DocumentStatus> = documents
        .map(|path| read_json_file(&path))
        .transpose()?;
    let resolver = LocationBackend::load(&config.lookup, registry.as_deref())?.into_resolver();

    let view = ReviewAssembler::new(resolver)
        .assemble(
            &snapshot,
            documents.as_ref(),
            ReviewProgress {
                form_completed,
                terms_accepted,
            },
        )
        .await;
    render_review(&view);
    Ok(())
}

pub(crate) fn run_stage(args: StageArgs) -> Result<(), AppError> {
    let StageArgs { file, slot, output } = args;

    let config = AppConfig::load()?;
    let bytes = std::fs::read(&file)?;
    let mime_type = mime_guess::from_path(&file)
        .first_or_octet_stream()
        .essence_str()
        .to_string();
    let file_name = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());

    let store = Arc::new(MemorySessionStore::new(config.storage.quota_bytes));
    let mut staging = DocumentStaging::with_config(store, &config.form);
    let now = Utc::now();
    let staged = staging.accept(
        IncomingFile {
            file_name,
            mime_type,
            bytes,
        },
        slot,
        now,
    )?;

    println!("Staged {}", slot.label());
    println!("  File: {}", staged.slot.file_name);
    println!("  Type: {}", staged.slot.mime_type);
    println!("  Size: {}", format_size(staged.slot.size_bytes));
    println!(
        "  Session store: {}",
        if staged.durability.is_persisted() {
            "saved"
        } else {
            "full, kept in memory only"
        }
    );
    for notice in staging.notices().active() {
        println!("  ! {}", notice.message);
    }

    match staging.plan_continue(now) {
        ContinueDecision::Proceed { incomplete: false } => {
            println!("All required documents are staged.")
        }
        ContinueDecision::Proceed { incomplete: true } => {
            println!("Some required documents are still missing.")
        }
        ContinueDecision::Confirm(prompt) => println!(
            "Still required: {} (confirm after {}s to continue without them)",
            prompt.missing.join(", "),
            prompt.remaining_wait(now)
        ),
    }

    if let Some(path) = output {
        std::fs::write(&path, serde_json::to_vec_pretty(&staged.slot)?)?;
        println!("Wrote session entry to {}", path.display());
    }
    Ok(())
}

pub(crate) fn run_dashboard(args: DashboardArgs) -> Result<(), AppError> {
    let application: SubmittedApplication = read_json_file(&args.submission)?;
    render_dashboard(&DashboardView::project(&application));
    Ok(())
}

fn render_report(report: &FormReport) {
    if report.is_valid() {
        println!("Application form is complete.");
        return;
    }

    println!("Application form has {} issue(s)", report.errors.len());
    for issue in &report.errors {
        println!("  - {} ({}): {}", issue.field.label(), issue.field, issue.message);
    }
    if let Some(focus) = report.focus {
        println!("First field to fix: {}", focus.label());
    }
}

fn render_review(view: &ReviewView) {
    for section in &view.sections {
        println!("\n{}", section.title);
        for entry in &section.entries {
            println!("  {:<28} {}", entry.label, entry.value);
        }
    }

    println!("\nDocuments");
    for line in &view.documents {
        let mark = if line.uploaded { "x" } else { " " };
        println!("  [{mark}] {}", line.label);
    }
    if !view.missing_documents.is_empty() {
        println!("Missing: {}", view.missing_documents.join(", "));
    }

    match &view.blocked_reason {
        Some(reason) => println!("\nNot ready to submit: {reason}"),
        None => println!("\nReady to submit."),
    }
}

fn render_dashboard(view: &DashboardView) {
    println!("Application {}", view.reference_number);
    println!("  {:<16} {}", "Status", view.status_label);
    println!("  {:<16} {}", "Grade Level", view.grade_level);
    println!("  {:<16} {}", "Date Applied", view.date_applied);
    println!("  {:<16} {}", "Student", view.student_name);
    println!("  {:<16} {}", "LRN", view.lrn);
    println!("  {:<16} {}", "Birth Date", view.birth_date);
    println!("  {:<16} {}", "Email", view.email);
    println!("  {:<16} {}", "Contact Number", view.contact);

    println!("\nDocuments");
    for line in &view.documents {
        println!("  {:<28} {}", line.label, line.review.label());
    }
}
