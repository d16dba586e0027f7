//! Test doubles for the external collaborators, plus a wired-up instance of
//! the whole core.

#![allow(dead_code)]

use std::{
	collections::HashMap,
	sync::{
		atomic::{AtomicBool, Ordering},
		Arc, Mutex,
	},
	time::Duration,
};

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::broadcast;

use lectio_core::{
	alignment::{table::AlignmentDoc, AlignmentTable, ClusterResolver},
	domain::{BookId, EditionId, RecordId, RecordPatch, RemoteRecord, VerseRef},
	infra::{
		Catalog, ConnectionState, Connectivity, Identity, RemoteAnnotationApi, RemoteApiError,
		TextError, TextRepository, UserId,
	},
	session::ReaderSession,
	sync::{SyncClient, SyncOrchestrator},
	CoreConfig,
};

/// Shared ordered log of observable side effects, used to assert sequencing
/// across mocks.
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal_entries(journal: &Journal) -> Vec<String> {
	journal.lock().unwrap().clone()
}

pub struct MockRemoteApi {
	pub records: Mutex<HashMap<RecordId, RemoteRecord>>,
	pub journal: Journal,
	unreachable: AtomicBool,
	reject_writes: AtomicBool,
	fetch_delay: Mutex<Option<Duration>>,
}

impl MockRemoteApi {
	pub fn new(journal: Journal) -> Arc<Self> {
		Arc::new(Self {
			records: Mutex::new(HashMap::new()),
			journal,
			unreachable: AtomicBool::new(false),
			reject_writes: AtomicBool::new(false),
			fetch_delay: Mutex::new(None),
		})
	}

	pub fn set_unreachable(&self, unreachable: bool) {
		self.unreachable.store(unreachable, Ordering::SeqCst);
	}

	pub fn set_reject_writes(&self, reject: bool) {
		self.reject_writes.store(reject, Ordering::SeqCst);
	}

	pub fn set_fetch_delay(&self, delay: Option<Duration>) {
		*self.fetch_delay.lock().unwrap() = delay;
	}

	pub fn seed(&self, record: RemoteRecord) {
		self.records.lock().unwrap().insert(record.id, record);
	}

	pub fn stored(&self, id: RecordId) -> Option<RemoteRecord> {
		self.records.lock().unwrap().get(&id).cloned()
	}

	pub fn entries_matching(&self, prefix: &str) -> usize {
		self.journal
			.lock()
			.unwrap()
			.iter()
			.filter(|line| line.starts_with(prefix))
			.count()
	}

	fn reachable(&self) -> Result<(), RemoteApiError> {
		if self.unreachable.load(Ordering::SeqCst) {
			Err(RemoteApiError::Unreachable("network down".to_string()))
		} else {
			Ok(())
		}
	}

	fn writable(&self) -> Result<(), RemoteApiError> {
		self.reachable()?;

		if self.reject_writes.load(Ordering::SeqCst) {
			Err(RemoteApiError::Rejected("validation failed".to_string()))
		} else {
			Ok(())
		}
	}
}

#[async_trait]
impl RemoteAnnotationApi for MockRemoteApi {
	async fn fetch_range(
		&self,
		book: &BookId,
		chapter_start: u32,
		chapter_end: u32,
	) -> Result<Vec<RemoteRecord>, RemoteApiError> {
		let delay = *self.fetch_delay.lock().unwrap();
		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}

		self.reachable()?;
		self.journal
			.lock()
			.unwrap()
			.push(format!("fetch {book} {chapter_start}-{chapter_end}"));

		Ok(self
			.records
			.lock()
			.unwrap()
			.values()
			.filter(|record| {
				record.book == *book
					&& record.chapter >= chapter_start
					&& record.chapter <= chapter_end
			})
			.cloned()
			.collect())
	}

	async fn create(&self, record: &RemoteRecord) -> Result<(), RemoteApiError> {
		self.writable()?;
		self.journal
			.lock()
			.unwrap()
			.push(format!("create {}", record.id));

		// Idempotent by client-generated id.
		self.records
			.lock()
			.unwrap()
			.entry(record.id)
			.or_insert_with(|| record.clone());

		Ok(())
	}

	async fn update(&self, id: RecordId, patch: &RecordPatch) -> Result<(), RemoteApiError> {
		self.writable()?;
		self.journal.lock().unwrap().push(format!("update {id}"));

		match self.records.lock().unwrap().get_mut(&id) {
			Some(record) => {
				record.apply(patch);
				Ok(())
			}
			None => Err(RemoteApiError::Rejected(format!("unknown record {id}"))),
		}
	}

	async fn delete(&self, id: RecordId) -> Result<(), RemoteApiError> {
		self.writable()?;
		self.journal.lock().unwrap().push(format!("delete {id}"));

		self.records.lock().unwrap().remove(&id);
		Ok(())
	}
}

pub struct MockConnectivity {
	state: Mutex<ConnectionState>,
	tx: broadcast::Sender<ConnectionState>,
}

impl MockConnectivity {
	pub fn new(initial: ConnectionState) -> Arc<Self> {
		let (tx, _) = broadcast::channel(16);

		Arc::new(Self {
			state: Mutex::new(initial),
			tx,
		})
	}

	pub fn set(&self, state: ConnectionState) {
		*self.state.lock().unwrap() = state;
		let _ = self.tx.send(state);
	}
}

impl Connectivity for MockConnectivity {
	fn check_now(&self) -> ConnectionState {
		*self.state.lock().unwrap()
	}

	fn subscribe(&self) -> broadcast::Receiver<ConnectionState> {
		self.tx.subscribe()
	}
}

pub struct MockIdentity {
	user: Mutex<Option<UserId>>,
	tx: broadcast::Sender<Option<UserId>>,
}

impl MockIdentity {
	pub fn new(user: Option<UserId>) -> Arc<Self> {
		let (tx, _) = broadcast::channel(16);

		Arc::new(Self {
			user: Mutex::new(user),
			tx,
		})
	}

	pub fn sign_in(&self, name: &str) {
		let user = UserId::new(name);
		*self.user.lock().unwrap() = Some(user.clone());
		let _ = self.tx.send(Some(user));
	}

	pub fn sign_out(&self) {
		*self.user.lock().unwrap() = None;
		let _ = self.tx.send(None);
	}

	/// Change the current user without emitting an event; for shaping the
	/// state before the orchestrator starts.
	pub fn set_silently(&self, user: Option<UserId>) {
		*self.user.lock().unwrap() = user;
	}
}

impl Identity for MockIdentity {
	fn current(&self) -> Option<UserId> {
		self.user.lock().unwrap().clone()
	}

	fn subscribe(&self) -> broadcast::Receiver<Option<UserId>> {
		self.tx.subscribe()
	}
}

pub struct MockCatalog;

const BOOKS: &[(&str, u32)] = &[
	("Genesis", 50),
	("Psalms", 150),
	("Joel", 3),
	("Jonah", 4),
	("John", 21),
];

impl Catalog for MockCatalog {
	fn book_names(&self) -> Vec<BookId> {
		BOOKS.iter().map(|(name, _)| BookId::new(*name)).collect()
	}

	fn chapter_count(&self, book: &BookId) -> u32 {
		BOOKS
			.iter()
			.find(|(name, _)| *name == book.as_str())
			.map_or(0, |(_, chapters)| *chapters)
	}

	fn canonical_name(&self, name: &str) -> Option<BookId> {
		BOOKS
			.iter()
			.find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
			.map(|(candidate, _)| BookId::new(*candidate))
	}
}

pub struct MockTextRepository;

#[async_trait]
impl TextRepository for MockTextRepository {
	async fn chapter_text(
		&self,
		edition: &EditionId,
		book: &BookId,
		chapter: u32,
	) -> Result<Vec<(VerseRef, String)>, TextError> {
		let chapters = MockCatalog.chapter_count(book);

		if chapter == 0 || chapter > chapters {
			return Err(TextError::ChapterUnavailable {
				edition: edition.clone(),
				book: book.clone(),
				chapter,
			});
		}

		Ok((1..=10)
			.map(|verse| {
				(
					VerseRef::new(edition.as_str(), book.as_str(), chapter, verse),
					format!("[{edition}] {book} {chapter}:{verse}"),
				)
			})
			.collect())
	}
}

/// Alignment between the canonical "kjv" numbering and the Hebrew-style
/// "lsg" numbering used by the tests.
pub fn alignment_doc() -> AlignmentDoc {
	serde_json::from_value(serde_json::json!({
		"canonical": "kjv",
		"other": "lsg",
		"pairs": [
			{ "from": { "book": "Psalms", "chapter": 51, "verse": 1 },
			  "to":   { "book": "Psalms", "chapter": 51, "verse": 3 } },
			{ "from": { "book": "Psalms", "chapter": 51, "verse": 2 },
			  "to":   { "book": "Psalms", "chapter": 51, "verse": 4 } },
			{ "from": { "book": "Joel", "chapter": 2, "verse": 28 },
			  "to":   { "book": "Joel", "chapter": 3, "verse": 1 } },
			{ "from": { "book": "Jonah", "chapter": 1, "verse": 17 },
			  "to":   { "book": "Jonah", "chapter": 2, "verse": 1 } },
			{ "from": { "book": "Jonah", "chapter": 2, "verse": 1 },
			  "to":   { "book": "Jonah", "chapter": 2, "verse": 1 } }
		],
		"absent": {
			// The Psalm 51 superscription is numbered 1-2 in "lsg" and has no
			// counterpart verse in the canonical numbering.
			"other": [
				{ "book": "Psalms", "chapter": 51, "verse": 1 },
				{ "book": "Psalms", "chapter": 51, "verse": 2 }
			]
		}
	}))
	.unwrap()
}

/// A fully wired core over mock collaborators.
pub struct TestInstance {
	pub journal: Journal,
	pub api: Arc<MockRemoteApi>,
	pub connectivity: Arc<MockConnectivity>,
	pub identity: Arc<MockIdentity>,
	pub catalog: Arc<MockCatalog>,
	pub resolver: Arc<ClusterResolver>,
	pub client: Arc<SyncClient>,
	pub session: Arc<ReaderSession>,
	pub config: CoreConfig,
	_data_dir: TempDir,
}

impl TestInstance {
	pub fn new(initial: ConnectionState) -> Self {
		Self::with_alignment(initial, true)
	}

	pub fn with_alignment(initial: ConnectionState, aligned: bool) -> Self {
		let data_dir = TempDir::new().unwrap();
		let config = CoreConfig::default_with_dir(data_dir.path().to_path_buf());

		let journal: Journal = Arc::default();
		let api = MockRemoteApi::new(journal.clone());
		let connectivity = MockConnectivity::new(initial);
		let identity = MockIdentity::new(Some(UserId::new("user-1")));
		let catalog = Arc::new(MockCatalog);

		let resolver = Arc::new(ClusterResolver::new());
		if aligned {
			let table = AlignmentTable::from_doc(alignment_doc()).unwrap();
			resolver.install(Arc::new(table));
		}

		let client = Arc::new(SyncClient::new(
			api.clone(),
			connectivity.clone(),
			&config,
		));

		let session = ReaderSession::new(
			Arc::new(MockTextRepository),
			catalog.clone(),
			resolver.clone(),
			client.clone(),
			&config,
		);

		Self {
			journal,
			api,
			connectivity,
			identity,
			catalog,
			resolver,
			client,
			session,
			config,
			_data_dir: data_dir,
		}
	}

	/// A second session sharing the same sync client and resolver, as after
	/// a restart of the presentation layer.
	pub fn fresh_session(&self) -> Arc<ReaderSession> {
		ReaderSession::new(
			Arc::new(MockTextRepository),
			self.catalog.clone(),
			self.resolver.clone(),
			self.client.clone(),
			&self.config,
		)
	}

	pub fn orchestrator(&self) -> Arc<SyncOrchestrator> {
		SyncOrchestrator::new(
			self.client.clone(),
			self.catalog.clone(),
			self.connectivity.clone(),
			self.identity.clone(),
		)
	}
}

/// Poll until a condition holds, or give up after two seconds.
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
	let deadline = tokio::time::Instant::now() + Duration::from_secs(2);

	while tokio::time::Instant::now() < deadline {
		if condition() {
			return true;
		}
		tokio::time::sleep(Duration::from_millis(10)).await;
	}

	condition()
}
