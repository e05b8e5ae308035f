//! Form Check CLI
//!
//! Lints form definitions, validates value files against them, and previews
//! how their controls render.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use familiar_forms::render::preview_form;
use familiar_forms::{
    FormConfig, FormEngine, FormLinter, FormValues, FormsConfig, SchemaCompiler, SubmitOutcome,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "form-check")]
#[command(about = "Lint, validate and preview declarative form definitions")]
struct Cli {
    /// Path to a forms.toml configuration file
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report rules that have no effect and other definition problems
    Lint {
        /// Form definition (JSON)
        form: PathBuf,
    },

    /// Submit a set of values against a form definition
    Validate {
        /// Form definition (JSON)
        form: PathBuf,
        /// Values to submit (JSON object of field name to value)
        values: PathBuf,
    },

    /// Print a plain-text preview of the form's controls
    Render {
        /// Form definition (JSON)
        form: PathBuf,
        /// Values to fill in before rendering
        #[arg(short, long)]
        values: Option<PathBuf>,
        /// Validate before rendering so errors are shown
        #[arg(long)]
        validate: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn load_values(path: &Path) -> Result<FormValues, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Returns whether the command succeeded
fn run(cli: Cli) -> Result<bool, Box<dyn std::error::Error>> {
    let config = FormsConfig::load_from(cli.config.as_deref())?;
    let compiler = SchemaCompiler::new(config.clone());

    match cli.command {
        Commands::Lint { form } => {
            let definition = FormConfig::from_path(&form)?;
            let result = FormLinter::new().lint(&definition);

            println!("🔍 Linting {:?} ({} fields)", form, definition.fields.len());

            for error in &result.errors {
                println!("  ❌ [{}] {} at {}", error.code, error.message, error.path);
            }
            for warning in &result.warnings {
                println!("  ⚠️  [{}] {} at {}", warning.code, warning.message, warning.path);
            }

            if result.is_clean() {
                println!("✅ No lint errors");
            } else {
                println!("❌ {} lint error(s)", result.errors.len());
            }
            Ok(result.is_clean())
        }

        Commands::Validate { form, values } => {
            let definition = FormConfig::from_path(&form)?;
            let schema = compiler.compile_checked(&definition)?;
            let input = load_values(&values)?;

            let print = |submitted: &FormValues| -> anyhow::Result<()> {
                println!("{}", serde_json::to_string_pretty(submitted)?);
                Ok(())
            };
            let mut engine = FormEngine::with_schema(definition, schema, print);
            engine.set_values(input)?;

            match engine.submit()? {
                SubmitOutcome::Submitted(_) => {
                    println!("✅ Form is valid");
                    Ok(true)
                }
                SubmitOutcome::Rejected(errors) => {
                    for (field, message) in &errors {
                        println!("  ❌ {}: {}", field, message);
                    }
                    println!("❌ {} field(s) invalid", errors.len());
                    Ok(false)
                }
            }
        }

        Commands::Render { form, values, validate } => {
            let definition = FormConfig::from_path(&form)?;
            let schema = compiler.compile_checked(&definition)?;

            let discard = |_: &FormValues| -> anyhow::Result<()> { Ok(()) };
            let mut engine = FormEngine::with_schema(definition, schema, discard);

            if let Some(path) = values {
                engine.set_values(load_values(&path)?)?;
            }
            if validate {
                engine.validate_all();
            }

            println!("{}", preview_form(&engine, &config.submit.default_button_text));
            Ok(true)
        }
    }
}
