use clap::{Parser, ValueEnum};
use michi::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// CLI-specific mirror of the project stage for clap to parse.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum StageCli {
    Development,
    Production,
}

/// Resolves a navigation outcome against a navigation document
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the navigation JSON document
    document_path: String,

    /// The view the request is on
    #[arg(long, default_value = "/index.xhtml")]
    view: String,

    /// The action expression that produced the outcome
    #[arg(short, long)]
    action: Option<String>,

    /// The outcome to resolve
    #[arg(short, long)]
    outcome: Option<String>,

    /// Enter this flow before resolving
    #[arg(long)]
    enter_flow: Option<String>,

    /// Defining document of the flow to enter
    #[arg(long, default_value = "")]
    flow_document: String,

    /// Expression variable, as name=value (repeatable)
    #[arg(long = "var", value_name = "NAME=VALUE")]
    vars: Vec<String>,

    /// Prefix for redirect URLs
    #[arg(long, default_value = "")]
    context_path: String,

    #[arg(long, value_enum, default_value = "development")]
    stage: StageCli,

    /// Treat the request as an ajax request
    #[arg(long)]
    ajax: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    run(cli);
}

fn run(cli: Cli) {
    let start = Instant::now();
    let config = NavigationConfig::from_file(&cli.document_path).unwrap_or_else(|e| {
        exit_with_error(&format!(
            "Failed to load navigation document '{}': {}",
            cli.document_path, e
        ))
    });
    println!(
        "Loaded {} root rule(s) and {} flow(s) in {:?}",
        config.rules.len(),
        config.flows.len(),
        start.elapsed()
    );

    let evaluator = cli.vars.iter().fold(ScopedEvaluator::new(), |evaluator, var| {
        let (name, value) = var
            .split_once('=')
            .unwrap_or_else(|| exit_with_error(&format!("Expected NAME=VALUE, got '{}'", var)));
        evaluator.with_variable(name, parse_value(value))
    });
    let stage = match cli.stage {
        StageCli::Development => ProjectStage::Development,
        StageCli::Production => ProjectStage::Production,
    };

    let application = Application::builder()
        .flows(config.flows.clone())
        .evaluator(Arc::new(evaluator))
        .view_handler(Arc::new(DefaultViewHandler::new().with_context_path(cli.context_path.as_str())))
        .project_stage(stage)
        .build();
    let handler = NavigationHandler::builder(application.clone())
        .config(&config)
        .build();

    let mut ctx = RequestContext::for_view(cli.view.as_str());
    ctx.partial.ajax_request = cli.ajax;

    if let Some(flow_id) = &cli.enter_flow {
        let flow = application
            .flow_handler
            .flow(&cli.flow_document, flow_id)
            .unwrap_or_else(|| exit_with_error(&format!("No flow named '{}'", flow_id)));
        application
            .flow_handler
            .transition(&mut ctx, None, &FlowTarget::Within(flow), None, &cli.view)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to enter flow '{}': {}", flow_id, e)));
    }

    let resolve_start = Instant::now();
    let result = handler
        .handle_navigation(
            &mut ctx,
            cli.action.as_deref(),
            cli.outcome.as_deref(),
            &cli.flow_document,
        )
        .unwrap_or_else(|e| exit_with_error(&format!("Navigation failed: {}", e)));
    let resolve_duration = resolve_start.elapsed();

    println!("\nNavigation Finished!");
    match &result {
        NavigationResult::Redirect { view_id, url } => {
            println!("  -> Redirect to {}", view_id);
            println!("  -> URL: {}", url);
        }
        NavigationResult::Render { view_id } => println!("  -> Render {}", view_id),
        NavigationResult::Unresolved => println!("  -> No navigation case matched"),
    }
    println!("  -> Reason: {}", TraceFormatter::format_reason(ctx.resolution_trace()));
    match application.flow_handler.current_flow(&ctx) {
        Some(flow) => {
            println!("  -> Current flow: {}", flow.key());
            if let Some(node) = flow.node(flow.start_node_id()) {
                println!("  -> Start node: {} ({})", node.id(), node.kind());
            }
        }
        None => println!("  -> Current flow: none"),
    }
    for message in ctx.messages() {
        println!("  -> {}", message);
    }

    println!("\n--- Resolution Trace ---");
    println!("{}", TraceFormatter::format_trace(ctx.resolution_trace()));
    println!("\nResolved in {:?}", resolve_duration);
}

fn parse_value(raw: &str) -> Value {
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" => Value::Null,
        _ => raw
            .parse::<f64>()
            .map(Value::Number)
            .unwrap_or_else(|_| Value::Text(raw.to_string())),
    }
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
