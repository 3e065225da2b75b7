//! `memgarden image`: one image job read from stdin.

use std::io::Read;

use memgarden_companion::ImageJob;
use memgarden_core::ImageResponse;
use serde_json::{Value, json};

use super::{Overrides, Runtime};
use crate::output;

pub async fn run(overrides: &Overrides) -> Result<(), Box<dyn std::error::Error>> {
    let mut raw = String::new();
    std::io::stdin().read_to_string(&mut raw)?;
    let job = ImageJob::parse(&raw)?;

    let service = Runtime::load().image_service(overrides)?;
    let image = service.generate_image(&job).await?;

    output::emit(&output::success(image_payload(&job, image)));
    Ok(())
}

fn image_payload(job: &ImageJob, image: ImageResponse) -> Value {
    json!({
        "image_data": image.image_data,
        "text_response": image.text_response,
        "prompt": image.prompt,
        "model": image.model,
        "provider": image.provider,
        "type": job.kind().as_str(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_reports_resolved_type() {
        let job = ImageJob::parse(r#"{"type":"sketch","prompt":"a fern"}"#).unwrap();
        let image = ImageResponse {
            image_data: "aW1n".into(),
            text_response: "Generated realistic image: a fern...".into(),
            prompt: "a fern".into(),
            model: "stable-diffusion-xl".into(),
            provider: "getimg".into(),
        };
        let payload = image_payload(&job, image);
        assert_eq!(payload["type"], "custom");
        assert_eq!(payload["provider"], "getimg");
        assert_eq!(payload["image_data"], "aW1n");
    }
}
