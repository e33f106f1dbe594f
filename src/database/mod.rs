pub mod schema;

use std::{env, fmt, path::Path, time::Duration};

use chrono::NaiveDateTime;
use diesel::{
    prelude::*,
    r2d2::{ConnectionManager, Pool, PoolError, R2D2Connection},
};
use dotenvy::dotenv;
use log::info;

use crate::{
    error::StoreError,
    settings::{DatabaseSettings, DbScheme},
};

/// `keyval_key` of the list member that holds the lane name.
const LANE_KEY: &str = "lane";

/// `output_key` under which the pipeline records bamcheck reports.
const BAMCHECK_OUTPUT: &str = "bamcheck_files";

/// How long startup waits for the first connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of lanelet to bamcheck file mappings.
///
/// Implementations are shared by every in-flight request.
pub trait LaneletStore: Send + Sync {
    /// Find the most recently modified bamcheck file recorded for `lanelet`.
    fn latest_bamcheck(&self, lanelet: &Lanelet) -> Result<Option<BamcheckFile>, StoreError>;
}

/// A sequencing lane identifier, such as `5678_1#2`. Never empty.
#[derive(diesel_derive_newtype::DieselNewType)]
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct Lanelet(String);

impl Lanelet {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for Lanelet {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(());
        }

        Ok(Self(value.to_owned()))
    }
}

impl fmt::Display for Lanelet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The file row a lookup resolves to.
#[derive(Queryable, Selectable)]
#[diesel(table_name = crate::database::schema::file)]
#[derive(Debug, Clone, PartialEq)]
pub struct BamcheckFile {
    /// Location of the report on local or shared storage
    pub path: String,

    /// When the pipeline last modified the file, if it recorded it
    pub mtime: Option<NaiveDateTime>,
}

impl BamcheckFile {
    pub fn path(&self) -> &Path {
        Path::new(&self.path)
    }
}

/// Connection pool for one of the supported backends.
///
/// Connections are checked before every checkout, so one dropped by the
/// server is re-dialled instead of failing every later request.
pub enum DbPool {
    Sqlite(Pool<ConnectionManager<SqliteConnection>>),
    #[cfg(feature = "mysql")]
    Mysql(Pool<ConnectionManager<diesel::mysql::MysqlConnection>>),
}

impl DbPool {
    /// Connect using `settings`, unless `DATABASE_URL` is set in the
    /// environment or a `.env` file.
    pub fn establish(settings: &DatabaseSettings) -> Result<Self, StoreError> {
        dotenv().ok();
        let (url, shown) = match env::var("DATABASE_URL") {
            Ok(url) => (url, "$DATABASE_URL".to_owned()),
            Err(_) => (settings.url(), settings.redacted_url()),
        };

        info!("connecting to {:?} database {shown}...", settings.scheme);
        let pool = match settings.scheme {
            DbScheme::Sqlite => build_pool(&url).map(Self::Sqlite),
            #[cfg(feature = "mysql")]
            DbScheme::Mysql => build_pool(&url).map(Self::Mysql),
            #[cfg(not(feature = "mysql"))]
            DbScheme::Mysql => return Err(StoreError::Unsupported("mysql")),
        };

        pool.map_err(|source| StoreError::Connection { url: shown, source })
    }
}

fn build_pool<C>(url: &str) -> Result<Pool<ConnectionManager<C>>, PoolError>
where
    C: R2D2Connection + Send + 'static,
{
    Pool::builder()
        .min_idle(Some(1))
        .test_on_check_out(true)
        .connection_timeout(CONNECT_TIMEOUT)
        .build(ConnectionManager::<C>::new(url))
}

// The query is identical for every backend, but diesel needs the concrete
// connection type to check it.
macro_rules! latest_bamcheck {
    ($conn:expr, $lanelet:expr) => {{
        use schema::{file, keyvallistmember as lane, stepoutputfile as sof};

        file::table
            .inner_join(
                lane::table.on(lane::keyvallist
                    .eq(file::keyvallist)
                    .and(lane::keyval_key.eq(LANE_KEY))
                    .and(lane::val.eq($lanelet.clone()))),
            )
            .inner_join(
                sof::table.on(sof::file
                    .eq(file::id)
                    .and(sof::output_key.eq(BAMCHECK_OUTPUT))),
            )
            .order(file::mtime.desc())
            .select(BamcheckFile::as_select())
            .first::<BamcheckFile>($conn)
            .optional()
    }};
}

/// A [`LaneletStore`] backed by a SQL connection pool.
pub struct SqlStore {
    pool: DbPool,
}

impl SqlStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn connect(settings: &DatabaseSettings) -> Result<Self, StoreError> {
        let pool = DbPool::establish(settings)?;
        info!("connected");
        Ok(Self::new(pool))
    }
}

impl LaneletStore for SqlStore {
    fn latest_bamcheck(&self, lanelet: &Lanelet) -> Result<Option<BamcheckFile>, StoreError> {
        let found = match &self.pool {
            DbPool::Sqlite(pool) => {
                let mut conn = pool.get()?;
                latest_bamcheck!(&mut *conn, lanelet)?
            }
            #[cfg(feature = "mysql")]
            DbPool::Mysql(pool) => {
                let mut conn = pool.get()?;
                latest_bamcheck!(&mut *conn, lanelet)?
            }
        };

        Ok(found)
    }
}
