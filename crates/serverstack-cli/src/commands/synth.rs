//! `sstk synth`: Write the deployment manifest.

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use serverstack_common::config::AppConfig;
use serverstack_compose::manifest::CompositionManifest;

/// Encoding of the written manifest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ManifestFormat {
    /// Pretty-printed JSON.
    #[default]
    Json,
    /// YAML.
    Yaml,
}

/// Arguments for the `synth` command.
#[derive(Args, Debug)]
pub struct SynthArgs {
    /// Manifest encoding.
    #[arg(long, value_enum, default_value_t)]
    pub format: ManifestFormat,

    /// Write the manifest to a file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Executes the `synth` command.
///
/// The digest is always computed over the JSON encoding, so it does not
/// depend on `--format`.
///
/// # Errors
///
/// Returns an error if composition, encoding, or writing fails.
pub fn execute(args: &SynthArgs, config: AppConfig) -> anyhow::Result<()> {
    let composition = super::compose(config)?;
    let manifest = composition.manifest();
    let digest = composition.digest()?;
    let encoded = encode(&manifest, args.format)?;
    tracing::info!(%digest, format = ?args.format, "synthesized manifest");

    if let Some(ref path) = args.output {
        std::fs::write(path, &encoded)?;
        println!("Wrote {} ({digest})", path.display());
        println!("Stacks: {}", manifest.stacks.len());
    } else {
        print!("{encoded}");
        eprintln!("{digest}");
    }
    Ok(())
}

fn encode(manifest: &CompositionManifest, format: ManifestFormat) -> anyhow::Result<String> {
    let mut encoded = match format {
        ManifestFormat::Json => manifest.to_json()?,
        ManifestFormat::Yaml => serde_yaml::to_string(manifest)?,
    };
    if !encoded.ends_with('\n') {
        encoded.push('\n');
    }
    Ok(encoded)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;

    fn manifest() -> CompositionManifest {
        crate::stacks::compose(AppConfig::default())
            .expect("compose")
            .manifest()
    }

    #[test]
    fn json_manifest_parses_back() {
        let encoded = encode(&manifest(), ManifestFormat::Json).expect("encode");
        let back: CompositionManifest = serde_json::from_str(&encoded).expect("parse");
        assert_eq!(back, manifest());
    }

    #[test]
    fn yaml_manifest_parses_back() {
        let encoded = encode(&manifest(), ManifestFormat::Yaml).expect("encode");
        assert!(encoded.contains("deployment_order"));
        let back: CompositionManifest = serde_yaml::from_str(&encoded).expect("parse");
        assert_eq!(back.stacks.len(), 2);
    }

    #[test]
    fn writes_manifest_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("manifest.json");
        let args = SynthArgs {
            format: ManifestFormat::Json,
            output: Some(path.clone()),
        };
        execute(&args, AppConfig::default()).expect("synth");
        let content = std::fs::read_to_string(&path).expect("read");
        assert!(content.contains("\"physical_name\": \"dev-notes-Api\""));
    }
}
