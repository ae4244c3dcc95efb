mod datasets;
mod error;
mod net;
mod surface;
mod util;
mod view;

use anyhow::{bail, Result};
use datasets::FileDatasetSource;
use error::{QueryServiceError, ViewError};
use net::{spawn_client, Incoming, IncomingKind};
use routegraph_core::{Algorithm, QueryRequest};
use std::collections::VecDeque;
use std::time::Duration;
use surface::{JsonLinesFactory, NullFactory, SurfaceEvent, SurfaceFactory};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use util::config::{self, QueryEndpoint, QueryEndpointKind, SceneSink, ViewerConfig};
use view::state::LoadSummary;
use view::{ClickApplied, GraphViewState, OverlayPhase, PendingQuery, QueryReport};

const DEMO_ORIGIN: &str = "Nova Descoberta";
const DEMO_DESTINATION: &str = "Boa Viagem";

fn init_tracing() {
    let _ = tracing_subscriber::fmt::try_init();
}

// Handle to the query service. Sending goes through the client task spawned by
// connect; a dropped task surfaces as Disconnected on the incoming channel and
// the link must be redialed explicitly.
struct ServiceLink {
    endpoint: String,
    tx: Option<mpsc::Sender<QueryRequest>>,
    inc_tx: mpsc::Sender<Incoming>,
}

impl ServiceLink {
    fn new(endpoint: &QueryEndpoint, inc_tx: mpsc::Sender<Incoming>) -> Self {
        let QueryEndpointKind::UdsPath(path) = &endpoint.kind;
        let mut link = Self { endpoint: path.clone(), tx: None, inc_tx };
        if endpoint.auto_connect {
            link.connect();
        }
        link
    }

    fn connect(&mut self) {
        if self.tx.is_some() {
            return;
        }
        let (tx, rx) = mpsc::channel(64);
        spawn_client(self.endpoint.clone(), rx, self.inc_tx.clone());
        self.tx = Some(tx);
    }

    fn is_up(&self) -> bool {
        self.tx.is_some()
    }

    fn mark_down(&mut self) {
        self.tx = None;
    }

    fn send(&self, request: QueryRequest) -> Result<(), ViewError> {
        let Some(tx) = self.tx.as_ref() else {
            return Err(QueryServiceError::Disconnected.into());
        };
        tx.try_send(request)
            .map_err(|e| ViewError::QueryService(QueryServiceError::Transport(e.to_string())))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Load(String),
    Switch(String),
    Algo(Algorithm),
    Query { algorithm: Option<Algorithm>, origin: Option<String>, destination: Option<String> },
    Demo,
    Reset,
    Places,
    Datasets,
    Connect,
    SaveConfig,
    Status,
    Help,
    Quit,
    Empty,
}

// Whitespace splitting with double quotes grouping multi-word place names.
fn split_args(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for c in line.chars() {
        match c {
            '"' => quoted = !quoted,
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn parse_command(line: &str) -> Result<Command> {
    let words = split_args(line);
    let Some((head, rest)) = words.split_first() else {
        return Ok(Command::Empty);
    };
    match head.as_str() {
        "load" => match rest {
            [id] => Ok(Command::Load(id.clone())),
            _ => bail!("usage: load <dataset>"),
        },
        "switch" => match rest {
            [id] => Ok(Command::Switch(id.clone())),
            _ => bail!("usage: switch <dataset>"),
        },
        "algo" => {
            let [word] = rest else {
                bail!("usage: algo <bfs|dfs|dijkstra|bellman-ford>");
            };
            let Some(algorithm) = Algorithm::parse(word) else {
                bail!("unknown algorithm {word:?}");
            };
            Ok(Command::Algo(algorithm))
        }
        "query" | "run" => {
            let mut words = rest;
            let algorithm = words.first().and_then(|word| Algorithm::parse(word));
            if algorithm.is_some() {
                words = &words[1..];
            }
            if words.len() > 2 {
                bail!("usage: query [algorithm] [origin] [destination]");
            }
            Ok(Command::Query {
                algorithm,
                origin: words.first().cloned(),
                destination: words.get(1).cloned(),
            })
        }
        "demo" => Ok(Command::Demo),
        "reset" | "clear" => Ok(Command::Reset),
        "places" => Ok(Command::Places),
        "datasets" => Ok(Command::Datasets),
        "connect" => Ok(Command::Connect),
        "saveconfig" => Ok(Command::SaveConfig),
        "status" => Ok(Command::Status),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => bail!("unknown command {other:?}, try 'help'"),
    }
}

fn print_help() {
    println!("commands:");
    println!("  load <dataset>        mount a dataset");
    println!("  switch <dataset>      same as load: fresh surface, inputs cleared");
    println!("  datasets              list configured datasets");
    println!("  places                list place names in the active dataset");
    println!("  algo <name>           pick the algorithm for bare queries");
    println!("  query [algorithm] [origin] [destination]");
    println!("                        run a query; quote multi-word names");
    println!("  demo                  dijkstra {DEMO_ORIGIN} to {DEMO_DESTINATION}");
    println!("  reset                 restore baseline styles");
    println!("  connect               redial the query service");
    println!("  saveconfig            write the current config to disk");
    println!("  status                active dataset, inputs, link state");
    println!("  quit");
    println!("algorithms:");
    for algorithm in [Algorithm::Bfs, Algorithm::Dfs, Algorithm::Dijkstra, Algorithm::BellmanFord] {
        println!("  {:<13} {}", algorithm.as_str(), algorithm.describe());
    }
}

// A route of n places crosses n - 1 connections; the count reported is hops,
// not stops.
fn path_summary(algorithm: &str, cost: f64, route: &[String]) -> String {
    format!("{algorithm}: cost {cost:.1}, {} hop(s)", route.len().saturating_sub(1))
}

fn print_load(result: Result<LoadSummary, ViewError>) {
    match result {
        Ok(summary) => {
            println!("{}: {} places, {} connections", summary.id, summary.nodes, summary.edges)
        }
        Err(e) => println!("error: {e}"),
    }
}

fn print_status(state: &GraphViewState, link: &ServiceLink, pending: &VecDeque<PendingQuery>) {
    match state.active() {
        Some(active) => println!(
            "dataset: {} ({} places, {} connections, {})",
            active.id,
            active.model.nodes().len(),
            active.model.edges().len(),
            if active.directed { "directed" } else { "undirected" },
        ),
        None => println!("dataset: none"),
    }
    println!("algorithm: {}", state.selected_algorithm.as_str());
    println!("origin: {:?}  destination: {:?}", state.inputs.origin, state.inputs.destination);
    let phase = match state.overlay_phase() {
        OverlayPhase::Idle => "idle",
        OverlayPhase::Dimmed => "dimmed",
        OverlayPhase::Highlighted => "highlighted",
    };
    println!("overlay: {phase}");
    println!("service: {} ({})", link.endpoint, if link.is_up() { "up" } else { "down" });
    if !pending.is_empty() {
        println!("pending queries: {}", pending.len());
    }
}

fn run_query(
    state: &mut GraphViewState,
    link: &ServiceLink,
    pending: &mut VecDeque<PendingQuery>,
    algorithm: Option<Algorithm>,
    origin: Option<String>,
    destination: Option<String>,
) {
    let algorithm = algorithm.unwrap_or(state.selected_algorithm);
    state.selected_algorithm = algorithm;
    // Arguments left off the command fall back to the click-seeded inputs.
    let origin = origin.unwrap_or_else(|| state.inputs.origin.clone());
    let destination = destination
        .or_else(|| (!state.inputs.destination.is_empty()).then(|| state.inputs.destination.clone()));
    if origin.trim().is_empty() {
        println!("error: no origin; name one in the command or click a node");
        return;
    }

    match state.begin_query(algorithm, &origin, destination.as_deref()) {
        Ok(query) => {
            if let Err(e) = link.send(query.request.clone()) {
                println!("error: {e}");
                return;
            }
            state.inputs.origin = origin.trim().to_string();
            state.inputs.destination =
                destination.map(|d| d.trim().to_string()).unwrap_or_default();
            println!("{} query sent for {}", algorithm.as_str(), query.request.dataset);
            pending.push_back(query);
        }
        Err(e) => println!("error: {e}"),
    }
}

// Returns false when the loop should exit.
fn handle_line(
    line: &str,
    state: &mut GraphViewState,
    link: &mut ServiceLink,
    pending: &mut VecDeque<PendingQuery>,
) -> bool {
    let command = match parse_command(line) {
        Ok(command) => command,
        Err(e) => {
            println!("{e}");
            return true;
        }
    };
    match command {
        Command::Empty => {}
        Command::Quit => return false,
        Command::Help => print_help(),
        Command::Load(id) => print_load(state.load(&id)),
        Command::Switch(id) => print_load(state.switch_dataset(&id)),
        Command::Algo(algorithm) => {
            state.selected_algorithm = algorithm;
            println!("algorithm: {} ({})", algorithm.as_str(), algorithm.describe());
        }
        Command::Query { algorithm, origin, destination } => {
            run_query(state, link, pending, algorithm, origin, destination)
        }
        Command::Demo => run_query(
            state,
            link,
            pending,
            Some(Algorithm::Dijkstra),
            Some(DEMO_ORIGIN.to_string()),
            Some(DEMO_DESTINATION.to_string()),
        ),
        Command::Reset => match state.reset() {
            Ok(()) => println!("styles restored"),
            Err(e) => println!("error: {e}"),
        },
        Command::Places => {
            let names = state.place_names();
            if names.is_empty() {
                println!("no places; load a dataset first");
            }
            for name in names {
                println!("  {name}");
            }
        }
        Command::Datasets => {
            let active = state.active().map(|active| active.id.clone());
            for id in state.dataset_ids() {
                let marker = if active.as_deref() == Some(id) { "*" } else { " " };
                println!(" {marker} {id}");
            }
        }
        Command::Connect => {
            if link.is_up() {
                println!("already connected to {}", link.endpoint);
            } else {
                link.connect();
                println!("connecting to {}", link.endpoint);
            }
        }
        Command::SaveConfig => match config::save(state.config()) {
            Ok(path) => println!("config written to {}", path.display()),
            Err(e) => println!("error: {e:#}"),
        },
        Command::Status => print_status(state, link, pending),
    }
    true
}

// Responses are paired with requests in order: the service answers one frame
// per request on a single stream, so the front of the queue is always the
// query a frame belongs to.
fn handle_incoming(
    incoming: Incoming,
    state: &mut GraphViewState,
    link: &mut ServiceLink,
    pending: &mut VecDeque<PendingQuery>,
) {
    match incoming.kind {
        IncomingKind::Connected => {
            tracing::info!(endpoint = %incoming.endpoint, "query service connected");
            println!("query service connected");
        }
        IncomingKind::Disconnected => {
            tracing::warn!(endpoint = %incoming.endpoint, "query service disconnected");
            link.mark_down();
            for dropped in pending.drain(..) {
                println!(
                    "error: {} query on {} failed: {}",
                    dropped.request.algorithm.as_str(),
                    dropped.request.dataset,
                    QueryServiceError::Disconnected,
                );
            }
            println!("query service disconnected; 'connect' to redial");
        }
        IncomingKind::Error(message) => {
            tracing::warn!(endpoint = %incoming.endpoint, error = %message, "query service error");
            // A frame that failed to decode still consumed one answer slot.
            if let Some(dropped) = pending.pop_front() {
                println!(
                    "error: {} query failed: {}",
                    dropped.request.algorithm.as_str(),
                    QueryServiceError::Transport(message),
                );
            }
        }
        IncomingKind::Outcome(outcome) => {
            let Some(query) = pending.pop_front() else {
                tracing::warn!("response arrived with no query outstanding");
                return;
            };
            match state.complete_query(&query, outcome) {
                Ok(QueryReport::Stale) => {}
                Ok(QueryReport::Path { algorithm, cost, route }) => {
                    println!("{}", path_summary(&algorithm, cost, &route));
                    println!("  {}", route.join(" → "));
                }
                Ok(QueryReport::Expansion { algorithm, metric, reached }) => {
                    println!("{algorithm}: {reached} place(s) reached, shaded by {metric}");
                }
                Err(e) => println!("error: {e}"),
            }
        }
    }
}

async fn run_viewer(cfg: ViewerConfig) -> Result<()> {
    let (events_tx, events_rx) = crossbeam_channel::unbounded();
    let factory: Box<dyn SurfaceFactory> = match &cfg.scene_sink {
        SceneSink::JsonlPath(path) => Box::new(JsonLinesFactory::new(path.clone())),
        SceneSink::Null => Box::new(NullFactory),
    };
    let source = Box::new(FileDatasetSource::new(cfg.data_dir.clone()));
    let (inc_tx, mut inc_rx) = mpsc::channel::<Incoming>(256);
    let mut link = ServiceLink::new(&cfg.endpoint, inc_tx);
    let default_dataset = cfg.default_dataset.clone();
    let mut state = GraphViewState::new(cfg, source, factory, events_tx);

    match state.load(&default_dataset) {
        Ok(summary) => tracing::info!(
            dataset = %summary.id,
            nodes = summary.nodes,
            edges = summary.edges,
            "dataset mounted"
        ),
        Err(e) => tracing::warn!(dataset = %default_dataset, error = %e, "initial load failed"),
    }

    println!("routegraph viewer; type 'help' for commands");

    let mut pending: VecDeque<PendingQuery> = VecDeque::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut events_tick = tokio::time::interval(Duration::from_millis(50));

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !handle_line(&line, &mut state, &mut link, &mut pending) {
                    break;
                }
            }
            incoming = inc_rx.recv() => {
                // The link keeps a sender clone, so recv only yields None on shutdown.
                let Some(incoming) = incoming else { break };
                handle_incoming(incoming, &mut state, &mut link, &mut pending);
            }
            _ = events_tick.tick() => {
                for event in events_rx.try_iter() {
                    let SurfaceEvent::NodeClicked(id) = event;
                    match state.handle_node_click(&id) {
                        Some(ClickApplied::Origin(name)) => println!("origin set to {name}"),
                        Some(ClickApplied::Destination(name)) => println!("destination set to {name}"),
                        None => {}
                    }
                }
            }
        }
    }

    state.dispose();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cfg = config::load_or_default();
    run_viewer(cfg).await
}
