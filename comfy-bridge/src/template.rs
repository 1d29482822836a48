//! Workflow templates served as static resources.
//!
//! Templates are job graphs with `{{MODEL}}`, `{{PROMPT}}` and `{{SEED}}`
//! placeholders. The host substitutes them and submits the result through
//! `execute_workflow`; the bridge serves the raw text.

pub const MODEL_PLACEHOLDER: &str = "{{MODEL}}";
pub const PROMPT_PLACEHOLDER: &str = "{{PROMPT}}";
pub const SEED_PLACEHOLDER: &str = "{{SEED}}";

/// A named workflow template exposed under a `template://` URI.
#[derive(Debug, Clone, Copy)]
pub struct Template {
    pub uri: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub body: &'static str,
}

impl Template {
    pub const MIME_TYPE: &'static str = "application/json";
}

pub const FLUX_TXT2IMG: Template = Template {
    uri: "template://flux-txt2img",
    name: "flux-txt2img",
    description: "Flux text-to-image workflow template. Replace {{MODEL}}, {{PROMPT}} and {{SEED}} before submitting.",
    body: r#"{
  "1": {
    "class_type": "UNETLoader",
    "inputs": {"unet_name": "{{MODEL}}", "weight_dtype": "default"}
  },
  "2": {
    "class_type": "DualCLIPLoader",
    "inputs": {
      "clip_name1": "clip_l.safetensors",
      "clip_name2": "t5xxl_fp16.safetensors",
      "type": "flux"
    }
  },
  "3": {
    "class_type": "VAELoader",
    "inputs": {"vae_name": "ae.safetensors"}
  },
  "4": {
    "class_type": "CLIPTextEncode",
    "inputs": {"clip": ["2", 0], "text": "{{PROMPT}}"}
  },
  "5": {
    "class_type": "FluxGuidance",
    "inputs": {"conditioning": ["4", 0], "guidance": 3.5}
  },
  "6": {
    "class_type": "EmptyLatentImage",
    "inputs": {"width": 1024, "height": 1024, "batch_size": 1}
  },
  "7": {
    "class_type": "KSamplerSelect",
    "inputs": {"sampler_name": "euler"}
  },
  "8": {
    "class_type": "BasicScheduler",
    "inputs": {"model": ["1", 0], "scheduler": "simple", "steps": 20, "denoise": 1.0}
  },
  "9": {
    "class_type": "RandomNoise",
    "inputs": {"noise_seed": "{{SEED}}"}
  },
  "10": {
    "class_type": "BasicGuider",
    "inputs": {"model": ["1", 0], "conditioning": ["5", 0]}
  },
  "11": {
    "class_type": "SamplerCustomAdvanced",
    "inputs": {
      "noise": ["9", 0],
      "guider": ["10", 0],
      "sampler": ["7", 0],
      "sigmas": ["8", 0],
      "latent_image": ["6", 0]
    }
  },
  "12": {
    "class_type": "VAEDecode",
    "inputs": {"samples": ["11", 0], "vae": ["3", 0]}
  },
  "13": {
    "class_type": "SaveImage",
    "inputs": {"images": ["12", 0], "filename_prefix": "flux_output"}
  }
}"#,
};

/// Every template the bridge serves.
pub const TEMPLATES: &[Template] = &[FLUX_TXT2IMG];

pub fn find(uri: &str) -> Option<&'static Template> {
    TEMPLATES.iter().find(|t| t.uri == uri)
}

#[cfg(test)]
mod tests {
    use super::*;
    use comfy_bridge_common::{NodeInput, NodeLink, Workflow};
    use serde_json::json;

    /// Substitute placeholders the way a host would, in a single pass so
    /// substituted text is never scanned again.
    fn render(template: &Template, model: &str, prompt: &str, seed: u64) -> Workflow {
        let seed = seed.to_string();
        let values = [
            (MODEL_PLACEHOLDER, escape(model)),
            (PROMPT_PLACEHOLDER, escape(prompt)),
            (SEED_PLACEHOLDER, seed),
        ];

        let mut text = String::new();
        let mut rest = template.body;
        while let Some(start) = rest.find("{{") {
            text.push_str(&rest[..start]);
            rest = &rest[start..];
            match values.iter().find(|(placeholder, _)| rest.starts_with(placeholder)) {
                Some((placeholder, value)) => {
                    text.push_str(value);
                    rest = &rest[placeholder.len()..];
                }
                None => {
                    text.push_str("{{");
                    rest = &rest[2..];
                }
            }
        }
        text.push_str(rest);

        serde_json::from_str(&text).unwrap()
    }

    /// JSON string escaping without the surrounding quotes.
    fn escape(raw: &str) -> String {
        let quoted = serde_json::Value::from(raw).to_string();
        quoted[1..quoted.len() - 1].to_string()
    }

    #[test]
    fn test_raw_template_is_valid_json() {
        let value: serde_json::Value = serde_json::from_str(FLUX_TXT2IMG.body).unwrap();
        assert_eq!(value.as_object().unwrap().len(), 13);
        assert_eq!(value["1"]["inputs"]["unet_name"], "{{MODEL}}");
    }

    #[test]
    fn test_render_substitutes_placeholders() {
        let workflow = render(&FLUX_TXT2IMG, "flux1-dev.safetensors", "a \"red\" fox\nat dusk", 42);

        let unet = workflow.node("1").unwrap();
        assert_eq!(unet.inputs["unet_name"], NodeInput::Literal(json!("flux1-dev.safetensors")));

        let encode = workflow.node("4").unwrap();
        assert_eq!(encode.inputs["text"], NodeInput::Literal(json!("a \"red\" fox\nat dusk")));
        assert_eq!(encode.inputs["clip"], NodeInput::Link(NodeLink::new("2", 0)));

        let noise = workflow.node("9").unwrap();
        assert_eq!(noise.inputs["noise_seed"], NodeInput::Literal(json!("42")));
    }

    #[test]
    fn test_substituted_text_is_not_rescanned() {
        let workflow = render(&FLUX_TXT2IMG, "odd-{{PROMPT}}-name", "{{SEED}}", 7);

        let unet = workflow.node("1").unwrap();
        assert_eq!(unet.inputs["unet_name"], NodeInput::Literal(json!("odd-{{PROMPT}}-name")));
        let encode = workflow.node("4").unwrap();
        assert_eq!(encode.inputs["text"], NodeInput::Literal(json!("{{SEED}}")));
    }

    #[test]
    fn test_find_by_uri() {
        assert!(find("template://flux-txt2img").is_some());
        assert!(find("template://nope").is_none());
    }
}
