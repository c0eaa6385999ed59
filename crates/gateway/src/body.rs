//! Request bodies for the model service and response decoding.

use base64::Engine;
use gallery_core::request::{ImageGenerationRequest, VideoGenerationRequest};
use serde_json::{json, Value};

use crate::error::HttpGatewayError;

/// Model id prefix for the Stable Diffusion family, which takes a flat
/// body instead of the task-typed one.
const STABILITY_PREFIX: &str = "stability.";

pub fn is_stability_model(model_id: &str) -> bool {
    model_id.starts_with(STABILITY_PREFIX)
}

/// Reduced `w:h` ratio, e.g. `1280x720` -> `16:9`.
pub fn aspect_ratio(width: u32, height: u32) -> String {
    fn gcd(a: u32, b: u32) -> u32 {
        if b == 0 {
            a
        } else {
            gcd(b, a % b)
        }
    }
    let d = gcd(width, height).max(1);
    format!("{}:{}", width / d, height / d)
}

/// Body for a synchronous image invocation.
pub fn image_body(request: &ImageGenerationRequest) -> Value {
    let params = &request.params;
    let seed = params.seed.unwrap_or(0);

    if is_stability_model(&request.model_id) {
        return json!({
            "prompt": request.prompt,
            "mode": "text-to-image",
            "aspect_ratio": aspect_ratio(params.width, params.height),
            "seed": seed,
            "output_format": "png",
        });
    }

    let config = json!({
        "numberOfImages": params.number_of_images,
        "width": params.width,
        "height": params.height,
        "cfgScale": params.cfg_scale,
        "seed": seed,
    });

    if params.color_guide.is_empty() {
        json!({
            "taskType": "TEXT_IMAGE",
            "textToImageParams": { "text": request.prompt },
            "imageGenerationConfig": config,
        })
    } else {
        json!({
            "taskType": "COLOR_GUIDED_GENERATION",
            "colorGuidedGenerationParams": {
                "text": request.prompt,
                "colors": params.color_guide,
            },
            "imageGenerationConfig": config,
        })
    }
}

/// Model input for an asynchronous text-to-video job.
pub fn video_model_input(request: &VideoGenerationRequest) -> Value {
    let params = &request.params;
    let mut text_params = json!({ "text": request.prompt });
    if let Some(image) = &request.reference_image {
        text_params["images"] = json!([{
            "format": "png",
            "source": { "bytes": image },
        }]);
    }

    json!({
        "taskType": "TEXT_VIDEO",
        "textToVideoParams": text_params,
        "videoGenerationConfig": {
            "durationSeconds": params.duration_seconds,
            "fps": params.fps,
            "dimension": params.dimension,
            "seed": params.resolved_seed(),
        },
    })
}

/// Full body for starting an asynchronous invocation.
pub fn start_async_body(
    model_id: &str,
    model_input: Value,
    output_uri: &str,
    client_request_token: &str,
) -> Value {
    json!({
        "clientRequestToken": client_request_token,
        "modelId": model_id,
        "modelInput": model_input,
        "outputDataConfig": {
            "s3OutputDataConfig": { "s3Uri": output_uri },
        },
    })
}

/// Decode the base64 `images` array of an image response.
///
/// All or nothing: any malformed entry fails the whole response.
pub fn decode_images(response: &Value) -> Result<Vec<Vec<u8>>, HttpGatewayError> {
    let images = response
        .get("images")
        .and_then(Value::as_array)
        .ok_or_else(|| HttpGatewayError::Decode("response has no 'images' array".into()))?;

    if images.is_empty() {
        return Err(HttpGatewayError::Decode("response contains no images".into()));
    }

    images
        .iter()
        .enumerate()
        .map(|(i, image)| {
            let encoded = image
                .as_str()
                .ok_or_else(|| HttpGatewayError::Decode(format!("image {i} is not a string")))?;
            base64::engine::general_purpose::STANDARD
                .decode(encoded)
                .map_err(|e| HttpGatewayError::Decode(format!("image {i} is not base64: {e}")))
        })
        .collect()
}
