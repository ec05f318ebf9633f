//! Compile the trainer from its C++ sources.

use tracing::info;

use crate::TrainerResult;
use crate::config::TrainerConfig;
use crate::engine::{BuildArtifact, Compiler};
use crate::runner::LineSink;

pub fn run(config: &TrainerConfig, out: &mut dyn LineSink) -> TrainerResult<BuildArtifact> {
    let compiler = Compiler::new(config.build.clone());
    out.emit("Compiling trainer...");
    out.emit(&format!("Command: {}", compiler.display_command()));

    let artifact = compiler.build()?;
    info!(output = %artifact.output_path.display(), "trainer built");

    out.emit("Build succeeded");
    match artifact.size_kb() {
        Some(kb) => out.emit(&format!(
            "Executable created: {} ({kb:.1} KB)",
            artifact.output_path.display()
        )),
        None => out.emit(&format!(
            "Executable created: {}",
            artifact.output_path.display()
        )),
    }
    out.emit(&format!("Build time: {:.2}s", artifact.build_time.as_secs_f64()));
    Ok(artifact)
}
