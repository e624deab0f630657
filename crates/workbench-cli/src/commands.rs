//! Subcommand implementations

use std::path::Path;

use prompt_parts::{
    append_attachments, AttachmentFile, AttachmentPolicy, ImageEncoder, ImageProcessor,
    IngestNotice, NoticeSeverity, PromptPart,
};
use workbench_api::{
    AnalysisResult, AttemptReport, BackendRegistry, GenerationRequest, InlineImage, WorkbenchApi,
    WorkbenchSettings,
};

use crate::error::CliError;
use crate::output::{masked_settings, write_images};
use crate::GenerateArgs;

async fn read_attachment(path: &Path) -> Result<AttachmentFile, CliError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| CliError::io(path, e))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(AttachmentFile::new(name, bytes))
}

/// Run one file through the image processor outside the prompt budget
async fn encode_single(path: &Path, policy: &AttachmentPolicy) -> Result<InlineImage, CliError> {
    let file = read_attachment(path).await?;
    let encoded = ImageProcessor.encode(&file, policy).await?;
    Ok(InlineImage {
        mime_type: encoded.mime_type,
        data: encoded.data,
    })
}

fn report_notices(notices: &[IngestNotice]) {
    for notice in notices {
        match notice.severity() {
            NoticeSeverity::Info => log::info!("{}", notice),
            NoticeSeverity::Error => log::warn!("{}", notice),
        }
    }
}

fn print_analysis(result: &AnalysisResult) -> Result<(), CliError> {
    match &result.parsed {
        Some(parsed) => println!("{}", serde_json::to_string_pretty(parsed)?),
        None => println!("{}", result.raw_text),
    }
    Ok(())
}

pub async fn generate(data_dir: &Path, args: GenerateArgs) -> Result<(), CliError> {
    let settings = WorkbenchSettings::load(data_dir).await?;
    let api = WorkbenchApi::from_settings(&settings)?;

    let mut files = Vec::with_capacity(args.images.len());
    for path in &args.images {
        files.push(read_attachment(path).await?);
    }

    let mut parts = Vec::new();
    if !args.prompt.trim().is_empty() {
        parts.push(PromptPart::text(&args.prompt));
    }
    let (parts, notices) =
        append_attachments(&parts, files, &settings.attachments, &ImageProcessor).await;
    report_notices(&notices);

    let reference_image = match &args.reference {
        Some(path) => Some(encode_single(path, &settings.attachments).await?),
        None => None,
    };

    let request = GenerationRequest {
        prompt: args.prompt.clone(),
        parts,
        negative_prompt: args.negative.clone(),
        reference_image,
        image_size: args.size.clone(),
        aspect_ratio: args.aspect.clone(),
        contents: None,
    };

    let progress = |report: &AttemptReport| match report {
        AttemptReport::Success {
            attempt, images, ..
        } => eprintln!("attempt {}: {} image(s)", attempt, images.len()),
        AttemptReport::Failure { attempt, error } => {
            eprintln!("attempt {}: {}", attempt, error)
        }
    };

    let outcome = api
        .generate_images(&settings, &request, args.count, Some(&progress))
        .await?;

    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();
    for location in write_images(&args.out, &stamp, &outcome.images).await? {
        println!("{}", location);
    }

    for partial in &outcome.partial_errors {
        log::warn!("Attempt {} failed: {}", partial.attempt, partial.message);
    }
    if !outcome.text.is_empty() {
        eprintln!("{}", outcome.text);
    }
    log::info!(
        "{}/{} attempts succeeded in {} ms",
        outcome.succeeded_count,
        outcome.requested_count,
        outcome.elapsed_ms
    );
    Ok(())
}

pub async fn analyze_prompt(
    data_dir: &Path,
    prompt: &str,
    instruction: Option<&str>,
) -> Result<(), CliError> {
    let settings = WorkbenchSettings::load(data_dir).await?;
    let api = WorkbenchApi::from_settings(&settings)?;

    let result = api.analyze_prompt(&settings, prompt, instruction).await?;
    print_analysis(&result)
}

pub async fn analyze_image(
    data_dir: &Path,
    path: &Path,
    instruction: Option<&str>,
) -> Result<(), CliError> {
    let settings = WorkbenchSettings::load(data_dir).await?;
    let api = WorkbenchApi::from_settings(&settings)?;

    let image = encode_single(path, &settings.attachments).await?;
    let result = api.analyze_image(&settings, &image, instruction).await?;
    print_analysis(&result)
}

pub async fn settings(data_dir: &Path, init: bool) -> Result<(), CliError> {
    let path = data_dir.join("settings.json");
    let settings = WorkbenchSettings::load(data_dir).await?;
    if init && !path.exists() {
        settings.save(data_dir).await?;
    }

    println!("{}", path.display());
    println!("{}", serde_json::to_string_pretty(&masked_settings(&settings))?);

    for info in BackendRegistry::new().list(settings.api_format) {
        println!(
            "{} {:<8} image output: {:<5} vision: {:<5} search: {}",
            if info.active { "*" } else { " " },
            info.name,
            info.capabilities.image_output,
            info.capabilities.vision,
            info.capabilities.search
        );
    }
    Ok(())
}
