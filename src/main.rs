use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::bail;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing_subscriber::EnvFilter;

use sigma::config::seconds;
use sigma::llm::{LlmQueryOptions, LlmRequest, query_llm};
use sigma::registry::{Endpoint, get_llm_endpoints, resolve_llm_endpoint};
use sigma::scan::{DEFAULT_ENTROPY_THRESHOLD, DEFAULT_MIN_LENGTH, ScanOptions, scan_diff};
use sigma::voice::{AudioInput, WhisperRequest, save_speech, transcribe_audio};
use sigma::{Config, ConversationComponents, ConversationOptions, run_conversation};

/// Sigma - voice assistant toolkit
#[derive(Parser)]
#[command(name = "sigma", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List or resolve LLM endpoints from llms.txt
    Endpoints {
        /// Path to llms.txt; defaults to the bundled copy
        path: Option<PathBuf>,
        /// Resolve a single endpoint instead of listing all
        #[arg(short, long)]
        resolve: bool,
        /// Endpoint to resolve (case-insensitive); implies --resolve
        #[arg(short, long)]
        name: Option<String>,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Send a prompt to an LLM endpoint
    Query {
        /// Prompt to send; read from stdin when omitted
        prompt: Option<String>,
        #[command(flatten)]
        llm: LlmArgs,
        /// Pretty-print the JSON response body when available
        #[arg(long)]
        show_json: bool,
    },
    /// Transcribe an audio file with a Whisper server
    Transcribe {
        /// Audio file to send
        audio: PathBuf,
        #[command(flatten)]
        whisper: WhisperArgs,
        /// Print the language and raw JSON alongside the transcript
        #[arg(long)]
        json: bool,
    },
    /// Synthesise speech into a WAV file
    Speak {
        /// Text to speak
        text: String,
        /// Output WAV path
        #[arg(short, long)]
        output: PathBuf,
        /// Sample rate in Hz
        #[arg(long)]
        sample_rate: Option<u32>,
    },
    /// Transcribe audio, ask an LLM, and speak the reply
    Converse {
        /// Recorded audio file
        audio: PathBuf,
        /// Prompt sent instead of the transcript
        #[arg(long)]
        prompt: Option<String>,
        /// Prompt template with {transcript} and {language}
        #[arg(long, conflicts_with = "no_template")]
        template: Option<String>,
        /// Send no prompt; rely on --extra for the request body
        #[arg(long)]
        no_template: bool,
        #[command(flatten)]
        whisper: WhisperArgs,
        #[command(flatten)]
        llm: LlmArgs,
        /// Where to write the spoken reply
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Reply sample rate in Hz
        #[arg(long)]
        sample_rate: Option<u32>,
    },
    /// Scan a unified diff on stdin for likely secrets
    ScanSecrets {
        /// Minimum Shannon entropy (bits) to flag high-entropy strings
        #[arg(long, default_value_t = DEFAULT_ENTROPY_THRESHOLD)]
        entropy_threshold: f64,
        /// Minimum length for entropy-based detection
        #[arg(long, default_value_t = DEFAULT_MIN_LENGTH)]
        min_length: usize,
        /// Emit findings as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct LlmArgs {
    /// Endpoint name (case-insensitive)
    #[arg(short, long)]
    name: Option<String>,
    /// Path to llms.txt (expands ~ and $VAR)
    #[arg(short, long)]
    path: Option<PathBuf>,
    /// JSON object merged into the request body
    #[arg(short, long)]
    extra: Option<String>,
    /// Request timeout in seconds
    #[arg(short, long)]
    timeout: Option<f64>,
}

#[derive(Args)]
struct WhisperArgs {
    /// Whisper inference URL
    #[arg(long)]
    whisper_url: Option<String>,
    /// Whisper model identifier
    #[arg(long)]
    model: Option<String>,
    /// Language hint
    #[arg(long)]
    language: Option<String>,
    /// Sampling temperature
    #[arg(long)]
    temperature: Option<f64>,
    /// JSON object merged into the Whisper request body
    #[arg(long)]
    whisper_extra: Option<String>,
    /// Whisper request timeout in seconds
    #[arg(long)]
    whisper_timeout: Option<f64>,
}

#[derive(Serialize)]
struct EndpointEntry<'a> {
    name: &'a str,
    url: &'a str,
    is_default: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn,sigma=warn",
        1 => "info,sigma=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Command::Endpoints {
            path,
            resolve,
            name,
            json,
        } => cmd_endpoints(path.as_deref(), resolve, name.as_deref(), json),
        Command::Query {
            prompt,
            llm,
            show_json,
        } => cmd_query(prompt, &llm, show_json).await,
        Command::Transcribe {
            audio,
            whisper,
            json,
        } => cmd_transcribe(audio, &whisper, json).await,
        Command::Speak {
            text,
            output,
            sample_rate,
        } => cmd_speak(&text, &output, sample_rate),
        Command::Converse {
            audio,
            prompt,
            template,
            no_template,
            whisper,
            llm,
            output,
            sample_rate,
        } => {
            let template = if no_template {
                None
            } else {
                Some(template.unwrap_or_else(|| {
                    sigma::conversation::DEFAULT_PROMPT_TEMPLATE.to_string()
                }))
            };
            cmd_converse(audio, prompt, template, &whisper, &llm, output, sample_rate).await
        }
        Command::ScanSecrets {
            entropy_threshold,
            min_length,
            json,
        } => cmd_scan_secrets(entropy_threshold, min_length, json),
    }
}

/// Parse a `--extra` style flag into a JSON object
fn parse_json_object(raw: Option<&str>, flag: &str) -> anyhow::Result<Option<Map<String, Value>>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(Some(map)),
        Ok(_) => bail!("{flag} JSON must decode to an object"),
        Err(e) => bail!("Failed to parse {flag} JSON: {e}"),
    }
}

fn read_stdin() -> anyhow::Result<String> {
    let mut data = String::new();
    std::io::stdin().read_to_string(&mut data)?;
    Ok(data)
}

fn llm_options(config: &Config, args: &LlmArgs) -> anyhow::Result<LlmQueryOptions> {
    let timeout = match args.timeout {
        Some(secs) => seconds("--timeout", secs)?,
        None => config.llm_timeout,
    };
    Ok(LlmQueryOptions {
        name: args.name.clone().or_else(|| config.default_llm.clone()),
        path: args.path.clone().or_else(|| config.llms_path.clone()),
        request: LlmRequest {
            prompt: None,
            extra_payload: parse_json_object(args.extra.as_deref(), "--extra")?,
            timeout,
        },
    })
}

fn whisper_request(config: &Config, args: &WhisperArgs) -> anyhow::Result<WhisperRequest> {
    let timeout = match args.whisper_timeout {
        Some(secs) => seconds("--whisper-timeout", secs)?,
        None => config.whisper.timeout,
    };
    Ok(WhisperRequest {
        url: Some(
            args.whisper_url
                .clone()
                .unwrap_or_else(|| config.whisper.url.clone()),
        ),
        model: args.model.clone().or_else(|| config.whisper.model.clone()),
        language: args
            .language
            .clone()
            .or_else(|| config.whisper.language.clone()),
        temperature: args.temperature,
        extra_params: parse_json_object(args.whisper_extra.as_deref(), "--whisper-extra")?,
        timeout,
    })
}

fn cmd_endpoints(
    path: Option<&Path>,
    resolve: bool,
    name: Option<&str>,
    json: bool,
) -> anyhow::Result<ExitCode> {
    let config = Config::load()?;
    let path = path.or(config.llms_path.as_deref());
    let fallback = config.default_llm.as_deref();

    let endpoints: Vec<Endpoint> = if resolve || name.is_some() {
        vec![resolve_llm_endpoint(name.or(fallback), path)?]
    } else {
        get_llm_endpoints(path)?
    };

    let default = if endpoints.is_empty() {
        None
    } else if resolve || name.is_some() {
        resolve_llm_endpoint(fallback, path).ok()
    } else {
        Some(resolve_llm_endpoint(fallback, path)?)
    };

    let entries: Vec<EndpointEntry<'_>> = endpoints
        .iter()
        .map(|e| EndpointEntry {
            name: &e.name,
            url: &e.url,
            is_default: default.as_ref() == Some(e),
        })
        .collect();

    if json {
        let payload = if resolve || name.is_some() {
            serde_json::to_string_pretty(&entries[0])?
        } else {
            serde_json::to_string_pretty(&entries)?
        };
        println!("{payload}");
    } else {
        for entry in &entries {
            let suffix = if entry.is_default { " [default]" } else { "" };
            println!("{}: {}{suffix}", entry.name, entry.url);
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn cmd_query(
    prompt: Option<String>,
    args: &LlmArgs,
    show_json: bool,
) -> anyhow::Result<ExitCode> {
    let prompt = match prompt {
        Some(prompt) => prompt,
        None => {
            let data = read_stdin()?;
            if data.is_empty() {
                bail!("Prompt is required when standard input is empty.");
            }
            data.trim_end_matches('\n').to_string()
        }
    };

    let config = Config::load()?;
    let options = llm_options(&config, args)?;
    let response = query_llm(Some(&prompt), &options).await?;

    println!("{}", response.text);
    if show_json {
        match response.json() {
            Ok(Some(payload)) => println!("{}", serde_json::to_string_pretty(&payload)?),
            Ok(None) => eprintln!("Warning: No JSON payload available."),
            Err(e) => eprintln!("Warning: Unable to display JSON payload ({e})"),
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn cmd_transcribe(audio: PathBuf, args: &WhisperArgs, json: bool) -> anyhow::Result<ExitCode> {
    let config = Config::load()?;
    let request = whisper_request(&config, args)?;
    let result = transcribe_audio(AudioInput::Path(audio), &request).await?;

    println!("{}", result.text);
    if json {
        if let Some(language) = &result.language {
            eprintln!("language: {language}");
        }
        match result.json() {
            Ok(Some(payload)) => println!("{}", serde_json::to_string_pretty(&payload)?),
            Ok(None) => eprintln!("Warning: No JSON payload available."),
            Err(e) => eprintln!("Warning: Unable to display JSON payload ({e})"),
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn cmd_speak(text: &str, output: &Path, sample_rate: Option<u32>) -> anyhow::Result<ExitCode> {
    let config = Config::load()?;
    let path = save_speech(text, output, sample_rate.unwrap_or(config.tts_sample_rate))?;
    println!("{}", path.display());
    Ok(ExitCode::SUCCESS)
}

async fn cmd_converse(
    audio: PathBuf,
    prompt: Option<String>,
    prompt_template: Option<String>,
    whisper: &WhisperArgs,
    llm: &LlmArgs,
    output_path: Option<PathBuf>,
    sample_rate: Option<u32>,
) -> anyhow::Result<ExitCode> {
    let config = Config::load()?;
    let options = ConversationOptions {
        prompt,
        prompt_template,
        whisper: whisper_request(&config, whisper)?,
        llm: llm_options(&config, llm)?,
        tts_sample_rate: sample_rate.unwrap_or(config.tts_sample_rate),
        output_path,
    };

    let result = run_conversation(
        Some(AudioInput::Path(audio)),
        &options,
        &ConversationComponents::default(),
    )
    .await?;

    println!("you: {}", result.transcript.text);
    println!("{}: {}", result.llm.name, result.llm.text);
    if let Some(path) = &result.audio_path {
        println!("audio: {}", path.display());
    }

    Ok(ExitCode::SUCCESS)
}

fn cmd_scan_secrets(entropy_threshold: f64, min_length: usize, json: bool) -> anyhow::Result<ExitCode> {
    let diff = read_stdin()?;
    if diff.trim().is_empty() {
        return Ok(ExitCode::SUCCESS);
    }

    let findings = scan_diff(
        &diff,
        &ScanOptions {
            entropy_threshold,
            min_length,
        },
    );
    if findings.is_empty() {
        return Ok(ExitCode::SUCCESS);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&findings)?);
    } else {
        println!("Potential secrets detected:\n");
        for finding in &findings {
            println!("- line {}: {}", finding.line_no, finding.rule);
            println!("  snippet: {}", finding.line);
        }
        println!(
            "\nIf this is a false positive, add '{}' to the line or adjust the commit.",
            sigma::scan::ALLOWLIST_TOKEN
        );
    }

    Ok(ExitCode::FAILURE)
}
