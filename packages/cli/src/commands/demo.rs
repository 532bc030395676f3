use crate::config::Config;
use anyhow::{Context as _, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use trellis_renderer::tags::{button, div, h1, li, p, span, ul};
use trellis_renderer::{
    attr, children, cleanup, component, deps, dispatch_event, key, portal, use_effect,
    use_element_ref, use_state, Child, CommitStats, Component, Document, Event, MemoryDocument,
    NodeId, Root, RootBuilder, Scope, Setter, SharedDocument,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    Counter,
    Todo,
    Portal,
    Background,
    All,
}

#[derive(Args, Debug)]
pub struct DemoArgs {
    /// Scenario to run
    #[arg(short, long, value_enum, default_value = "all")]
    pub scenario: Scenario,

    /// Clicks dispatched in the counter scenario
    #[arg(long, default_value = "3")]
    pub clicks: usize,
}

pub async fn demo(args: DemoArgs, config: &Config) -> Result<()> {
    println!("🌿 {} Trellis demo", "Starting".green().bold());
    println!();

    let all = args.scenario == Scenario::All;
    if all || args.scenario == Scenario::Counter {
        counter_demo(config, args.clicks)?;
    }
    if all || args.scenario == Scenario::Todo {
        todo_demo(config)?;
    }
    if all || args.scenario == Scenario::Portal {
        portal_demo(config)?;
    }
    if all || args.scenario == Scenario::Background {
        background_demo(config).await?;
    }

    println!("✨ {} Demo complete!", "Done".green().bold());
    Ok(())
}

struct Stage {
    document: Arc<Mutex<MemoryDocument>>,
    body: NodeId,
    root: Root,
}

impl Stage {
    fn new(config: &Config) -> Self {
        let mut document = MemoryDocument::new();
        let body = document.create_element("body");
        let document = Arc::new(Mutex::new(document));
        let root = RootBuilder::new(document.clone(), body)
            .options(config.root.clone())
            .build();
        Self {
            document,
            body,
            root,
        }
    }

    fn shared(&self) -> SharedDocument {
        self.document.clone()
    }

    fn html(&self, node: NodeId) -> Result<String> {
        let document = self
            .document
            .lock()
            .map_err(|_| anyhow::anyhow!("document lock poisoned"))?;
        Ok(document.to_html(node)?)
    }

    fn print(&self, step: &str) -> Result<()> {
        println!("   {} {}", "▸".cyan(), step);
        println!("     {}", self.html(self.body)?);
        print_stats(&self.root.stats());
        self.root.reset_stats();
        Ok(())
    }
}

fn print_stats(stats: &CommitStats) {
    println!(
        "     {} created {}, inserted {}, moved {}, removed {}, attrs {}, text {}",
        "stats:".dimmed(),
        stats.created(),
        stats.inserted,
        stats.moved,
        stats.removed,
        stats.attributes_set + stats.attributes_removed,
        stats.text_updates
    );
    if stats.failures > 0 {
        println!("     {} {}", "failures:".red(), stats.failures);
    }
}

struct ClickCounter {
    document: SharedDocument,
}

impl Component for ClickCounter {
    fn render(&self, scope: &mut Scope<'_>, _children: &[Child]) -> Child {
        let (count, set_count) = use_state(scope, 0i64);
        let element = use_element_ref(scope);
        let document = self.document.clone();
        let target = element.clone();

        use_effect(
            scope,
            move || {
                let node = target.node_id()?;
                let listener = document
                    .lock()
                    .ok()?
                    .add_event_listener(
                        node,
                        "click",
                        Arc::new(move |_: &Event| set_count.update(|n| n + 1)),
                    )
                    .ok()?;
                cleanup(move || {
                    if let Ok(mut document) = document.lock() {
                        let _ = document.remove_event_listener(node, listener);
                    }
                })
            },
            deps![],
        );

        button(children![element, attr("type", "button"), format!("Clicked {} times", count)]).into()
    }
}

fn counter_demo(config: &Config, clicks: usize) -> Result<()> {
    println!("{}", "Counter".bright_blue().bold());
    let stage = Stage::new(config);
    stage.root.render(component(
        ClickCounter {
            document: stage.shared(),
        },
        [],
    ))?;
    stage.print("mounted")?;

    let target = {
        let document = stage
            .document
            .lock()
            .map_err(|_| anyhow::anyhow!("document lock poisoned"))?;
        document
            .first_child(stage.body)?
            .context("counter rendered nothing")?
    };
    for click in 1..=clicks {
        stage
            .root
            .act(|| dispatch_event(&*stage.document, &Event::new("click", target)))??;
        stage.print(&format!("click {}", click))?;
    }
    println!();
    Ok(())
}

struct TodoList {
    items: Vec<&'static str>,
}

impl Component for TodoList {
    fn render(&self, _scope: &mut Scope<'_>, _children: &[Child]) -> Child {
        div(children![
            attr("class", "todos"),
            h1(children!["Todo"]),
            ul(self
                .items
                .iter()
                .map(|item| li(children![key(*item), *item]).into())
                .collect::<Vec<Child>>()),
        ])
        .into()
    }
}

fn todo_demo(config: &Config) -> Result<()> {
    println!("{}", "Keyed todo list".bright_blue().bold());
    let stage = Stage::new(config);
    let steps: [(&str, Vec<&'static str>); 4] = [
        ("initial", vec!["write", "test", "ship"]),
        ("rotate", vec!["ship", "write", "test"]),
        ("replace last", vec!["ship", "write", "review"]),
        ("reverse", vec!["review", "write", "ship"]),
    ];

    for (step, items) in steps {
        stage.root.render(component(TodoList { items }, []))?;
        stage.print(step)?;
    }
    println!();
    Ok(())
}

fn portal_demo(config: &Config) -> Result<()> {
    println!("{}", "Portal".bright_blue().bold());
    let stage = Stage::new(config);
    let overlay = {
        let mut document = stage
            .document
            .lock()
            .map_err(|_| anyhow::anyhow!("document lock poisoned"))?;
        document.create_element("aside")
    };

    stage.root.render(div(children![
        p(children!["page content"]),
        portal(overlay, children![span(children!["modal"])]),
    ]))?;
    stage.print("mounted")?;
    println!("     {} {}", "overlay:".dimmed(), stage.html(overlay)?);
    println!();
    Ok(())
}

struct Status {
    setter: Arc<Mutex<Option<Setter<String>>>>,
}

impl Component for Status {
    fn render(&self, scope: &mut Scope<'_>, _children: &[Child]) -> Child {
        let (status, set_status) = use_state(scope, "idle".to_string());
        if let Ok(mut slot) = self.setter.lock() {
            *slot = Some(set_status);
        }
        p(children![format!("status: {}", status)]).into()
    }
}

async fn background_demo(config: &Config) -> Result<()> {
    println!("{}", "Background commit loop".bright_blue().bold());
    let stage = Stage::new(config);
    let setter = Arc::new(Mutex::new(None));
    stage.root.render(component(
        Status {
            setter: setter.clone(),
        },
        [],
    ))?;
    stage.print("mounted")?;

    let set_status = setter
        .lock()
        .map_err(|_| anyhow::anyhow!("setter lock poisoned"))?
        .clone()
        .context("status component did not render")?;
    set_status.set("busy".to_string());
    println!(
        "   {} update queued, {} operations pending",
        "▸".cyan(),
        stage.root.scheduler().pending_len()
    );

    if config.root.background {
        let wait = config.root.scheduler.tick_ms.max(1) * 5;
        tokio::time::sleep(Duration::from_millis(wait)).await;
        stage.print("after background flush")?;
    } else {
        stage.root.flush()?;
        stage.print("after forced flush (background loop disabled)")?;
    }
    println!();
    Ok(())
}
