use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, Responder, get, put, web};
use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::{info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Deserialize;

use rs_chain_core::ChainError;
use rs_chain_core::config::ChainConfig;
use rs_chain_core::model::table::TransitionTable;
use rs_chain_core::store;

/// Query parameters for the `/v1/generate` endpoint
#[derive(Deserialize)]
struct GenerateParams {
	length: Option<usize>,
	seed: Option<u64>,
}

#[derive(Deserialize)]
struct LoadQuery {
	name: Option<String>,
}

/// State behind the server lock: one writer at a time.
struct SharedData {
	config: ChainConfig,
	table: TransitionTable,
	loaded: Option<String>,
	rng: StdRng,
}

impl SharedData {
	fn new(config: ChainConfig) -> Self {
		Self {
			rng: config.rng(),
			config,
			table: TransitionTable::new(),
			loaded: None,
		}
	}

	/// Replaces the table with the chain of `data_dir/<name>.txt`.
	fn load(&mut self, name: &str) -> Result<(), ChainError> {
		let corpus = self
			.config
			.data_dir()
			.join(name)
			.with_extension(store::CORPUS_EXTENSION);
		self.table = store::load_or_train(&corpus, self.config.unit, self.config.snapshot)?;
		self.loaded = Some(name.to_owned());
		Ok(())
	}
}

type Shared = web::Data<Mutex<SharedData>>;

/// Maps a chain error to the matching HTTP status.
fn error_response(error: &ChainError) -> HttpResponse {
	let body = error.to_string();
	match error {
		ChainError::EmptyModel => HttpResponse::Conflict().body(body),
		ChainError::CorruptData(_) => HttpResponse::UnprocessableEntity().body(body),
		ChainError::Io(e) if e.kind() == ErrorKind::NotFound => HttpResponse::NotFound().body(body),
		_ => HttpResponse::InternalServerError().body(body),
	}
}

/// Corpus names map to files, so they may not walk out of the data folder.
fn valid_name(name: &str) -> bool {
	!name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_')
}

macro_rules! lock_or_500 {
	($data:expr) => {
		match $data.lock() {
			Ok(guard) => guard,
			Err(_) => return HttpResponse::InternalServerError().body("Chain lock failed"),
		}
	};
}

/// HTTP GET endpoint `/v1/generate`
///
/// Returns `length + 1` generated words separated by spaces. A `seed`
/// makes the answer reproducible; otherwise the shared random source is used.
#[get("/v1/generate")]
async fn get_generated(data: Shared, query: web::Query<GenerateParams>) -> impl Responder {
	let mut shared_data = lock_or_500!(data);
	let length = query.length.unwrap_or(shared_data.config.length);

	let words = match query.seed {
		Some(seed) => shared_data.table.generate(length, &mut StdRng::seed_from_u64(seed)),
		None => {
			let SharedData { table, rng, .. } = &mut *shared_data;
			table.generate(length, rng)
		}
	};

	match words {
		Ok(words) => HttpResponse::Ok().body(words.join(" ")),
		Err(e) => error_response(&e),
	}
}

#[get("/v1/corpora")]
async fn get_corpora(data: Shared) -> impl Responder {
	let data_dir = lock_or_500!(data).config.data_dir();
	match store::list_corpora(&data_dir) {
		Ok(names) => HttpResponse::Ok().body(names.join("\n")),
		Err(e) => error_response(&e),
	}
}

#[get("/v1/loaded")]
async fn get_loaded(data: Shared) -> impl Responder {
	let shared_data = lock_or_500!(data);
	HttpResponse::Ok().body(shared_data.loaded.clone().unwrap_or_default())
}

#[put("/v1/load")]
async fn put_load(data: Shared, query: web::Query<LoadQuery>) -> impl Responder {
	let name = match &query.name {
		Some(s) if valid_name(s.trim()) => s.trim(),
		_ => return HttpResponse::BadRequest().body("Missing or invalid corpus name"),
	};

	let mut shared_data = lock_or_500!(data);
	match shared_data.load(name) {
		Ok(()) => HttpResponse::Ok().body(format!("Loaded {} words", shared_data.table.len())),
		Err(e) => {
			warn!("cannot load {name}: {e}");
			error_response(&e)
		}
	}
}

/// HTTP PUT endpoint `/v1/train`
///
/// Ingests the request body into the current chain, cut by the configured training unit.
#[put("/v1/train")]
async fn put_train(data: Shared, body: String) -> impl Responder {
	let mut shared_data = lock_or_500!(data);
	let unit = shared_data.config.unit;
	let recorded = store::train_text(&mut shared_data.table, &body, unit);
	HttpResponse::Ok().body(format!("Recorded {recorded} transitions"))
}

#[get("/v1/snapshot")]
async fn get_snapshot(data: Shared) -> impl Responder {
	let shared_data = lock_or_500!(data);
	match shared_data.table.serialize() {
		Ok(text) => HttpResponse::Ok().content_type("application/json").body(text),
		Err(e) => error_response(&e),
	}
}

/// HTTP PUT endpoint `/v1/snapshot`
///
/// Replaces the whole chain. A rejected snapshot leaves the current chain untouched.
#[put("/v1/snapshot")]
async fn put_snapshot(data: Shared, body: String) -> impl Responder {
	let table = match TransitionTable::deserialize(&body) {
		Ok(table) => table,
		Err(e) => return error_response(&e),
	};

	let mut shared_data = lock_or_500!(data);
	shared_data.table = table;
	shared_data.loaded = None;
	HttpResponse::Ok().body(format!("Loaded {} words", shared_data.table.len()))
}

#[get("/v1/table")]
async fn get_table(data: Shared) -> impl Responder {
	let shared_data = lock_or_500!(data);
	HttpResponse::Ok().body(shared_data.table.to_string())
}

fn routes(cfg: &mut web::ServiceConfig) {
	cfg.service(get_generated)
		.service(get_corpora)
		.service(get_loaded)
		.service(put_load)
		.service(put_train)
		.service(get_snapshot)
		.service(put_snapshot)
		.service(get_table);
}

#[derive(Parser, Debug)]
#[command(name = "rs-chain-server", about = "HTTP front-end for a word Markov chain")]
struct Cli {
	/// JSON config file; flags below override its values.
	#[arg(long)]
	config: Option<PathBuf>,

	/// Address to bind.
	#[arg(long, default_value = "127.0.0.1")]
	host: String,

	/// Port to listen on.
	#[arg(long, default_value_t = 5000)]
	port: u16,

	/// Folder holding the corpora.
	#[arg(long)]
	data_dir: Option<PathBuf>,

	/// Seed for reproducible output.
	#[arg(long)]
	seed: Option<u64>,

	/// Corpus to load at startup.
	#[arg(long)]
	load: Option<String>,
}

/// Main entry point for the server.
///
/// Wraps the chain in a `Mutex` and starts an Actix-web HTTP server.
#[actix_web::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	let mut config = match &cli.config {
		Some(path) => ChainConfig::from_file(path).with_context(|| format!("cannot read config {}", path.display()))?,
		None => ChainConfig::default(),
	};
	if let Some(data_dir) = &cli.data_dir {
		config.data_dir = data_dir.clone();
	}
	if cli.seed.is_some() {
		config.seed = cli.seed;
	}

	env_logger::Builder::from_env(Env::default().default_filter_or(config.log_level.as_str())).init();

	let mut shared_data = SharedData::new(config);
	if let Some(name) = &cli.load {
		shared_data.load(name).with_context(|| format!("cannot load corpus {name}"))?;
	}
	let shared_data = web::Data::new(Mutex::new(shared_data));

	info!("listening on {}:{}", cli.host, cli.port);
	HttpServer::new(move || {
		App::new()
			.wrap(Cors::permissive())
			.app_data(shared_data.clone())
			.configure(routes)
	})
		.bind((cli.host.as_str(), cli.port))?
		.run()
		.await?;

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use actix_web::http::StatusCode;
	use actix_web::test;
	use actix_web::web::Bytes;

	fn shared(config: ChainConfig) -> Shared {
		web::Data::new(Mutex::new(SharedData::new(config)))
	}

	#[actix_web::test]
	async fn empty_chain_is_a_conflict() {
		let app = test::init_service(App::new().app_data(shared(ChainConfig::default())).configure(routes)).await;
		let req = test::TestRequest::get().uri("/v1/generate?length=3").to_request();
		let resp = test::call_service(&app, req).await;
		assert_eq!(resp.status(), StatusCode::CONFLICT);
	}

	#[actix_web::test]
	async fn train_then_generate() {
		let app = test::init_service(App::new().app_data(shared(ChainConfig::default())).configure(routes)).await;

		let req = test::TestRequest::put()
			.uri("/v1/train")
			.set_payload("i want to eat\ni want chinese food")
			.to_request();
		let body = test::call_and_read_body(&app, req).await;
		assert_eq!(body, Bytes::from_static(b"Recorded 6 transitions"));

		let req = test::TestRequest::get().uri("/v1/generate?length=4&seed=3").to_request();
		let body = test::call_and_read_body(&app, req).await;
		let text = String::from_utf8(body.to_vec()).unwrap();
		assert_eq!(text.split(' ').count(), 5);
	}

	#[actix_web::test]
	async fn corrupt_snapshot_keeps_current_chain() {
		let data = shared(ChainConfig::default());
		let app = test::init_service(App::new().app_data(data.clone()).configure(routes)).await;

		let req = test::TestRequest::put().uri("/v1/train").set_payload("a b c").to_request();
		test::call_service(&app, req).await;

		let req = test::TestRequest::put()
			.uri("/v1/snapshot")
			.set_payload(r#"{"version":1,"transitions":{"a":{"b":-4},"b":{}}}"#)
			.to_request();
		let resp = test::call_service(&app, req).await;
		assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
		assert_eq!(data.lock().unwrap().table.count("a", "b"), 1);
	}

	#[actix_web::test]
	async fn snapshot_round_trips_over_http() {
		let app = test::init_service(App::new().app_data(shared(ChainConfig::default())).configure(routes)).await;

		let req = test::TestRequest::put().uri("/v1/train").set_payload("x y x y z").to_request();
		test::call_service(&app, req).await;

		let req = test::TestRequest::get().uri("/v1/snapshot").to_request();
		let snapshot = test::call_and_read_body(&app, req).await;

		let other = test::init_service(App::new().app_data(shared(ChainConfig::default())).configure(routes)).await;
		let req = test::TestRequest::put().uri("/v1/snapshot").set_payload(snapshot.clone()).to_request();
		assert_eq!(test::call_service(&other, req).await.status(), StatusCode::OK);

		let req = test::TestRequest::get().uri("/v1/snapshot").to_request();
		assert_eq!(test::call_and_read_body(&other, req).await, snapshot);
	}

	#[actix_web::test]
	async fn load_reads_data_dir() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(dir.path().join("pets.txt"), "the cat sat\nthe dog sat").unwrap();
		let config = ChainConfig { data_dir: dir.path().to_path_buf(), ..ChainConfig::default() };
		let app = test::init_service(App::new().app_data(shared(config)).configure(routes)).await;

		let req = test::TestRequest::get().uri("/v1/corpora").to_request();
		assert_eq!(test::call_and_read_body(&app, req).await, Bytes::from_static(b"pets"));

		let req = test::TestRequest::put().uri("/v1/load?name=../etc").to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

		let req = test::TestRequest::put().uri("/v1/load?name=missing").to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

		let req = test::TestRequest::put().uri("/v1/load?name=pets").to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

		let req = test::TestRequest::get().uri("/v1/loaded").to_request();
		assert_eq!(test::call_and_read_body(&app, req).await, Bytes::from_static(b"pets"));
	}
}
