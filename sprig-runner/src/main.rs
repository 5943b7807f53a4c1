//! sprig-runner - a small service declared with the sprig keywords.

use std::env;

use serde_json::json;
use sprig::prelude::*;
use sprig::{Config, Entry};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_version() {
    println!("sprig-runner {}", VERSION);
}

fn person(ctx: &mut Context) -> HandlerResult<String> {
    let greeting = ctx.app().attr::<String>("greeting")?;
    Ok(format!("{} {}", greeting, ctx.named("name").unwrap_or("stranger")))
}

fn login(ctx: &mut Context) -> HandlerResult<()> {
    let user = ctx.param("user").unwrap_or("guest").to_string();
    ctx.stash().insert("user".into(), json!(user));
    ctx.template("login", &json!({ "user": user }))?;
    Ok(())
}

/// Declare the demo service and freeze it.
fn declare(options: Options) -> sprig::Result<Entry> {
    activate!(options)?;

    attr(
        "greeting",
        Attr::lazy(|app| {
            app.config("greeting")
                .and_then(|v| v.as_str())
                .unwrap_or("Hello")
                .to_string()
        }),
    )?;
    app()?.add_template("login", "<h1>Welcome, {{ user }}</h1>")?;

    route("/", |_: &mut Context| Ok("sprig is running"))?;
    get("/person/:name", person)?;
    post(([Method::Post], "/edit/:id"), |ctx: &mut Context| {
        Ok(json!({ "saved": ctx.named("id"), "title": ctx.param("title") }))
    })?;
    get("/edit/:id", |ctx: &mut Context| {
        Ok(json!({ "editing": ctx.named("id") }))
    })?;
    route("/login", "login")?;
    handler("login", login)?;

    debug("Demo routes declared");
    run()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "--version" || a == "-V") {
        print_version();
        return Ok(());
    }

    let config = match args.iter().position(|a| a == "--config") {
        Some(i) => {
            let path = args.get(i + 1).ok_or("--config needs a path")?;
            Config::load_from(path, true)
        }
        None => Config::load(),
    }
    .map_err(|e| format!("Failed to load configuration: {}", e))?;

    sprig::logging::init(&config.logging.level)?;
    tracing::info!("Starting sprig-runner {}", VERSION);

    let addr = config.server.addr()?;
    let entry = declare(config.app)?;
    for route in entry.summary() {
        tracing::info!(
            methods = %route.methods,
            pattern = %route.pattern,
            destination = %route.destination,
            "Route"
        );
    }

    sprig::serve(entry, addr).await?;

    Ok(())
}
