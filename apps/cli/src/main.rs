use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    config::normalize_api_base,
    lessons::LessonView,
    shell::{ensure_catalog, navigation},
    store::SessionState,
    viewport::{pending_session, LayerState},
    ActionOutcome, ClientSettings, HttpTutorialApi, LessonController, NavDirection,
    PlaygroundController, Route, SessionStore, TutorialApi, UploadedFile, Viewport,
    ViewportFrame,
};
use shared::domain::{CompiledModel, ExampleId, LessonId};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cq-tutorial", about = "CadQuery selector tutorial")]
struct Cli {
    /// Backend API base, e.g. http://127.0.0.1:8000/api
    #[arg(long, global = true)]
    api_base: Option<String>,
    /// Settings file; defaults to ./tutorial.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the backend is up.
    Health,
    /// List lessons in tutorial order.
    Lessons,
    /// List built-in example models.
    Examples,
    /// Open a lesson (the first one when no id is given).
    Lesson {
        id: Option<String>,
        /// Replace the lesson's starting selector.
        #[arg(long)]
        select: Option<String>,
        /// Run the selector against the lesson model.
        #[arg(long)]
        run: bool,
        #[arg(long)]
        show_solution: bool,
        #[arg(long)]
        highlight_only: bool,
    },
    /// Compile a model and run a selector against it.
    Playground {
        /// CadQuery source text.
        #[arg(long, conflicts_with_all = ["file", "example"])]
        source: Option<String>,
        /// STEP or STL file to upload.
        #[arg(long, conflicts_with = "example")]
        file: Option<PathBuf>,
        /// Built-in example id; the first example when nothing else is given.
        #[arg(long)]
        example: Option<String>,
        #[arg(long)]
        selection: Option<String>,
        #[arg(long)]
        min_area: Option<String>,
        #[arg(long)]
        max_area: Option<String>,
        #[arg(long)]
        min_length: Option<String>,
        #[arg(long)]
        max_length: Option<String>,
        #[arg(long)]
        highlight_only: bool,
    },
}

fn load_settings(cli: &Cli) -> Result<ClientSettings> {
    let mut settings = match &cli.config {
        Some(path) => client_core::load_settings_from(path)?,
        None => client_core::load_settings(),
    };
    if let Some(api_base) = &cli.api_base {
        settings.api_base = normalize_api_base(api_base);
    }
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_filter.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    info!("cli: api_base={}", settings.api_base);

    let http = Arc::new(HttpTutorialApi::from_settings(&settings)?);
    let api: Arc<dyn TutorialApi> = http.clone();
    let store = SessionStore::new();
    let viewport = Viewport::new(http.clone());

    match cli.command {
        Command::Health => {
            let health = api.health().await?;
            println!("backend status={}", health.status);
            if !health.is_ok() {
                bail!("backend reported status {}", health.status);
            }
        }
        Command::Lessons => {
            let status = ensure_catalog(api.as_ref(), &store).await;
            if let Some(message) = status.lessons_error {
                bail!(message);
            }
            for (index, lesson) in store.snapshot().lessons.iter().enumerate() {
                println!("{:>2}. {}  {}", index + 1, lesson.id, lesson.title);
                if !lesson.goal.is_empty() {
                    println!("    {}", lesson.goal);
                }
            }
        }
        Command::Examples => {
            let status = ensure_catalog(api.as_ref(), &store).await;
            if let Some(message) = status.examples_error {
                bail!(message);
            }
            for example in &store.snapshot().examples {
                println!("{}  {}  [{}]", example.id, example.name, example.tag_line());
            }
        }
        Command::Lesson {
            id,
            select,
            run,
            show_solution,
            highlight_only,
        } => {
            let lessons = LessonController::new(Arc::clone(&api), store.clone());
            ensure_catalog(api.as_ref(), &store).await;

            let id = match id {
                Some(id) => LessonId::from(id),
                None => match lessons.resolve_route(None).await {
                    Some(Route::Lessons(Some(first))) => first,
                    _ => bail!("no lessons available"),
                },
            };

            let mut load = lessons.load_lesson(&id).await;
            if let Some(Route::Lessons(Some(target))) = load.redirect.clone() {
                println!("lesson {id} not found, opening {target}");
                load = lessons.load_lesson(&target).await;
            }
            report("load lesson", &load.outcome)?;

            let view = lessons.view().await;
            print_lesson(&view, &store.snapshot());

            if let Some(expression) = &select {
                lessons.set_selection(expression.as_str()).await;
            }
            if run || select.is_some() {
                report("run selection", &lessons.run_selection().await)?;
                print_selection(&store.snapshot(), &lessons.view().await.selection);
            }
            if show_solution {
                lessons.toggle_solution().await;
                if let Some(solution) = lessons.view().await.visible_solution() {
                    println!("solution: {solution}");
                }
            }
            if highlight_only {
                lessons.toggle_display_mode();
            }
            print_pending(lessons.view().await.model.as_ref(), &store.snapshot());
            print_frame(&lessons.render(&viewport).await);
        }
        Command::Playground {
            source,
            file,
            example,
            selection,
            min_area,
            max_area,
            min_length,
            max_length,
            highlight_only,
        } => {
            let playground = PlaygroundController::new(Arc::clone(&api), store.clone());
            playground.prepare().await;

            let upload = match &file {
                Some(path) => Some(
                    UploadedFile::read(path)
                        .await
                        .with_context(|| format!("failed to read '{}'", path.display()))?,
                ),
                None => None,
            };
            playground
                .edit_form(|form| {
                    form.source = source.unwrap_or_default();
                    form.upload = upload;
                    if let Some(example) = example {
                        form.selected_example = Some(ExampleId::from(example));
                    }
                    if let Some(selection) = selection {
                        form.selection = selection;
                    }
                    form.filters.min_area = min_area.unwrap_or_default();
                    form.filters.max_area = max_area.unwrap_or_default();
                    form.filters.min_length = min_length.unwrap_or_default();
                    form.filters.max_length = max_length.unwrap_or_default();
                })
                .await;

            match playground.compile().await {
                ActionOutcome::Skipped => {
                    bail!("nothing to compile; pass --source, --file or --example")
                }
                outcome => report("compile", &outcome)?,
            }
            let view = playground.view().await;
            if let Some(model) = &view.model {
                println!("model {}", model.model_id);
                if let Some(meta) = &model.meta {
                    println!(
                        "  area={:.3} volume={:.3} bbox={:?}",
                        meta.area, meta.volume, meta.bbox
                    );
                }
            }

            report("run selection", &playground.run_selection().await)?;
            print_selection(&store.snapshot(), &view.form.selection);
            if let Some(link) = playground.download_link() {
                println!("download: {}", http.resolve_asset_url(&link)?);
            }
            if highlight_only {
                playground.toggle_display_mode();
            }
            print_pending(playground.view().await.model.as_ref(), &store.snapshot());
            print_frame(&playground.render(&viewport).await);
        }
    }

    Ok(())
}

fn report(action: &str, outcome: &ActionOutcome) -> Result<()> {
    match outcome {
        ActionOutcome::Failed(message) => Err(anyhow!("{action}: {message}")),
        ActionOutcome::Skipped => {
            println!("{action}: nothing to do");
            Ok(())
        }
        ActionOutcome::Applied | ActionOutcome::Stale => Ok(()),
    }
}

fn print_lesson(view: &LessonView, state: &SessionState) {
    let Some(lesson) = &view.lesson else {
        return;
    };
    let route = Route::lesson(lesson.id.clone());
    let nav = navigation(state, &route);
    let position = state.lesson_index(&lesson.id).map_or(0, |index| index + 1);

    println!("[{}] {} ({position}/{})", nav.title, lesson.title, nav.lessons.len());
    println!("goal: {}", lesson.goal);
    if !lesson.snippet.is_empty() {
        println!("\n{}\n", lesson.snippet);
    }
    for note in &lesson.notes {
        println!("note: {note}");
    }
    for hint in view.hints() {
        println!("hint: {hint}");
    }
    println!("selector: {}", view.selection);

    for (label, direction) in [("prev", NavDirection::Previous), ("next", NavDirection::Next)] {
        if let Some(neighbor) =
            client_core::lessons::neighbor(&state.lesson_order, &lesson.id, direction)
        {
            println!("{label}: {}", Route::lesson(neighbor));
        }
    }
}

fn print_selection(state: &SessionState, editor_text: &str) {
    let Some(result) = &state.selection_result else {
        return;
    };
    println!("{}", result.counts);
    for item in &result.items {
        match item.hash {
            Some(hash) => println!("  {} {} #{hash}", item.kind, item.id),
            None => println!("  {} {}", item.kind, item.id),
        }
    }
    println!("history:");
    for entry in &state.history {
        println!("  {}  {}", entry.summary(), entry.expression_or(editor_text));
    }
}

fn print_pending(model: Option<&CompiledModel>, state: &SessionState) {
    let mode = state.display_mode;
    let frame = pending_session(model, state.selection_result.as_ref(), mode);
    if frame.is_loading() {
        println!(
            "viewport: loading {} layer(s), toggle with 'h': {}",
            frame.layers.len(),
            mode.toggle_label()
        );
    }
}

fn print_frame(frame: &ViewportFrame) {
    if frame.layers.is_empty() {
        println!("viewport: nothing to draw");
        return;
    }
    for rendered in &frame.layers {
        let layer = &rendered.layer;
        match &rendered.state {
            LayerState::Ready(mesh) => println!(
                "viewport: {:?} color={} opacity={:.2} bytes={}",
                layer.role,
                layer.material.color,
                layer.material.opacity,
                mesh.bytes.len()
            ),
            LayerState::Failed(reason) => {
                println!("viewport: {:?} unavailable ({reason})", layer.role)
            }
            LayerState::Loading => println!("viewport: {:?} loading", layer.role),
        }
    }
}
