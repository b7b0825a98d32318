//! Subcommand implementations.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use nabu_engine::{
    ActionDispatcher, ContextStore, ContextValue, EngineConfig, NativeActionRegistry, NativeActionResult,
    Session, VariablePath, resolve_value_expression,
};
use nabu_markup::{Component, MarkupBundle, UiAction};

use crate::cli::{ParseArgs, ResolveArgs, RunArgs};

// ── parse ─────────────────────────────────────────────────────────────────

/// Returns `false` when any section failed to parse.
pub fn run_parse(args: &ParseArgs, out: &mut impl Write) -> Result<bool> {
    let bundle = MarkupBundle::load_dir(&args.dir)
        .with_context(|| format!("failed to load microapp from {}", args.dir.display()))?;
    let (document, report) = bundle.parse_with_report();

    if args.json {
        serde_json::to_writer_pretty(&mut *out, &document).context("failed to serialize document")?;
        writeln!(out)?;
        return Ok(report.is_clean());
    }

    match &document.microapp {
        Some(m) => writeln!(out, "microapp  {} ({})", m.title, m.code)?,
        None => writeln!(out, "microapp  <none>")?,
    }
    writeln!(out, "styles    {}", document.styles.len())?;
    writeln!(out, "queries   {}", document.queries.len())?;
    writeln!(out, "screens   {}", document.screens.len())?;
    for screen in &document.screens {
        let nodes = screen.root.as_ref().map_or(0, Component::node_count);
        let link = screen.deeplink.as_deref().unwrap_or("-");
        writeln!(out, "  {:<16} {:>4} nodes  {}", screen.code, nodes, link)?;
    }
    for e in &report.errors {
        writeln!(out, "error     {}: {}", e.section, e.error)?;
    }
    Ok(report.is_clean())
}

// ── resolve ───────────────────────────────────────────────────────────────

pub fn run_resolve(args: &ResolveArgs, out: &mut impl Write) -> Result<()> {
    let mut store = ContextStore::new();
    apply_vars(&mut store, &args.vars);
    let resolved = resolve_value_expression(&args.expr, &store.snapshot(&HashMap::new()));
    writeln!(out, "{resolved}")?;
    Ok(())
}

fn apply_vars(store: &mut ContextStore, vars: &[(String, String)]) {
    for (key, value) in vars {
        store.set_path(&VariablePath::parse(key), ContextValue::parse_literal(value));
    }
}

// ── run ───────────────────────────────────────────────────────────────────

pub async fn run_session(args: &RunArgs, out: &mut impl Write) -> Result<()> {
    let bundle = MarkupBundle::load_dir(&args.dir)
        .with_context(|| format!("failed to load microapp from {}", args.dir.display()))?;
    let document = Arc::new(bundle.parse());

    let script = match &args.script {
        Some(path) => read_script(path)?,
        None => Vec::new(),
    };

    let mut config = EngineConfig::default().with_theme(args.theme.into());
    if let Some(code) = &args.initial_screen {
        config = config.with_initial_screen(code.clone());
    }

    let dispatcher = ActionDispatcher::new(document.clone())
        .with_deeplink_handler(Arc::new(|uri: &str| {
            let external = uri.starts_with("http://") || uri.starts_with("https://");
            if external {
                log::info!("would open {uri} in a browser");
            }
            external
        }))
        .with_native_executor(Arc::new(studio_natives()));

    let mut session = Session::start(document, config)
        .context("failed to start session")?
        .with_dispatcher(dispatcher);
    apply_vars(&mut session.state_mut().context, &args.vars);

    print_frame(&session, out)?;
    for (step, action) in script.iter().enumerate() {
        match session.dispatch(action).await {
            Ok(outcome) => writeln!(out, "#{step} {} -> {outcome:?}", action.type_code())?,
            Err(e) => writeln!(out, "#{step} {} -> error: {e}", action.type_code())?,
        }
        print_frame(&session, out)?;
    }
    Ok(())
}

fn read_script(path: &Path) -> Result<Vec<UiAction>> {
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid action script {}", path.display()))
}

/// Native actions available to scripts.
///
/// `echo` writes every parameter back to the context, keys addressed like
/// variable paths.
fn studio_natives() -> NativeActionRegistry {
    NativeActionRegistry::new().with("echo", |params: &BTreeMap<String, String>| {
        let data = params
            .iter()
            .map(|(k, v)| (k.clone(), ContextValue::parse_literal(v)))
            .collect();
        NativeActionResult::Success(Some(data))
    })
}

fn print_frame(session: &Session, out: &mut impl Write) -> Result<()> {
    let Some(frame) = session.current_screen() else {
        return Ok(());
    };
    writeln!(out, "   screen {} (depth {})", frame.code(), session.state().navigation.len())?;
    if let Some(tree) = session.current_tree() {
        print_tree(&tree, 2, out)?;
    }
    Ok(())
}

fn print_tree(node: &Component, depth: usize, out: &mut impl Write) -> Result<()> {
    let pad = "  ".repeat(depth);
    match node {
        Component::Layout(layout) => {
            writeln!(out, "{pad}{:?}", layout.kind)?;
            for child in &layout.children {
                print_tree(child, depth + 1, out)?;
            }
        }
        Component::Widget(widget) => {
            let props: Vec<String> = widget
                .properties
                .iter()
                .map(|p| format!("{}={:?}", p.code, p.effective()))
                .collect();
            writeln!(out, "{pad}{:?} {}", widget.kind, props.join(" "))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::cli::ThemeArg;

    fn demo() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("demo/shop")
    }

    fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn parse_demo_is_clean() {
        let mut buf = Vec::new();
        let clean = run_parse(&ParseArgs { dir: demo(), json: false }, &mut buf).unwrap();
        let text = output(buf);
        assert!(clean, "{text}");
        assert!(text.contains("microapp  Shop (shop)"));
        assert!(text.contains("home"));
    }

    #[test]
    fn parse_json_round_trips() {
        let mut buf = Vec::new();
        run_parse(&ParseArgs { dir: demo(), json: true }, &mut buf).unwrap();
        let doc: nabu_markup::Document = serde_json::from_slice(&buf).unwrap();
        assert!(doc.screen("detail").is_some());
    }

    #[test]
    fn resolve_with_vars() {
        let args = ResolveArgs {
            expr: "*if(@{shop.count} % 2 == 0)*then(even @@{user})*else(odd)".into(),
            vars: vec![("shop.count".into(), "4".into()), ("user".into(), "Ada".into())],
        };
        let mut buf = Vec::new();
        run_resolve(&args, &mut buf).unwrap();
        assert_eq!(output(buf), "even Ada\n");
    }

    #[tokio::test]
    async fn replay_demo_script() {
        let args = RunArgs {
            dir: demo(),
            script: Some(demo().join("script.json")),
            initial_screen: None,
            theme: ThemeArg::Light,
            vars: vec![("shop.user".into(), "Ada".into())],
        };
        let mut buf = Vec::new();
        run_session(&args, &mut buf).await.unwrap();
        let text = output(buf);
        assert!(text.contains("Hello Ada"), "{text}");
        assert!(text.contains("screen detail (depth 2)"), "{text}");
        assert!(text.contains("-> error: already at the root screen"), "{text}");
    }
}
