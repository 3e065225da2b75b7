//! `memgarden analyze`: describe a photo or video for a memory.

use std::io::Read;
use std::path::Path;

use memgarden_companion::MediaJob;
use memgarden_core::MediaAnalysis;
use serde_json::{Value, json};

use super::{Overrides, Runtime};
use crate::output;

/// Analyze `file` when given, otherwise a JSON job read from stdin.
pub async fn run(
    overrides: &Overrides,
    file: Option<&Path>,
    context: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut job = match file {
        Some(file) => {
            let bytes = std::fs::read(file)
                .map_err(|e| format!("Failed to read {}: {e}", file.display()))?;
            MediaJob::from_bytes(file.to_string_lossy(), &bytes)
        }
        None => {
            let mut raw = String::new();
            std::io::stdin().read_to_string(&mut raw)?;
            MediaJob::parse(&raw)?
        }
    };
    if let Some(context) = context {
        job.memory_context = Some(context.to_string());
    }

    let service = Runtime::load().media_service(overrides)?;
    let analysis = service.analyze_media(&job).await?;

    output::emit(&output::success(analysis_payload(&job, file, analysis)?));
    Ok(())
}

fn analysis_payload(
    job: &MediaJob,
    file: Option<&Path>,
    analysis: MediaAnalysis,
) -> Result<Value, Box<dyn std::error::Error>> {
    let mut payload = json!({
        "analysis": analysis.text,
        "model": analysis.model,
        "provider": analysis.provider,
        "media_type": job.kind()?.as_str(),
    });
    if let Some(name) = file.and_then(Path::file_name) {
        payload["file_name"] = Value::String(name.to_string_lossy().into_owned());
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis() -> MediaAnalysis {
        MediaAnalysis {
            text: "Two kids on bikes. What do you remember about that street?".into(),
            model: "gemini-2.5-flash".into(),
            provider: "google".into(),
        }
    }

    #[test]
    fn payload_names_the_file_and_media_type() {
        let job = MediaJob::from_bytes("/photos/bikes.webp", b"pixels");
        let payload = analysis_payload(&job, Some(Path::new("/photos/bikes.webp")), analysis()).unwrap();
        assert_eq!(payload["media_type"], "image");
        assert_eq!(payload["file_name"], "bikes.webp");
        assert_eq!(payload["provider"], "google");
        assert!(payload["analysis"].as_str().unwrap().ends_with('?'));
    }

    #[test]
    fn stdin_payload_has_no_file_name() {
        let job = MediaJob::parse(r#"{"mediaType":"video","data":"aGVsbG8="}"#).unwrap();
        let payload = analysis_payload(&job, None, analysis()).unwrap();
        assert_eq!(payload["media_type"], "video");
        assert!(payload.get("file_name").is_none());
    }
}
