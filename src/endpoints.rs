use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use log::{error, info, warn};
use rocket::{
    Request, State, get,
    http::ContentType,
    response::{self, Responder, Response},
    tokio::{fs, task},
};

use crate::{
    database::{Lanelet, LaneletStore},
    error::LookupError,
    stream::LoggedFile,
};

/// Fetch the bamcheck file of a lanelet named in the path.
#[get("/lanelet/<lanelet>")]
pub async fn lanelet_by_path(
    store: &State<Arc<dyn LaneletStore>>,
    lanelet: &str,
) -> Result<BamcheckDownload, LookupError> {
    lookup_lanelet(store, lanelet).await
}

/// Fetch the bamcheck file of a lanelet named in the query string,
/// `/?lanelet=5678_1%232`.
#[get("/?<lanelet>")]
pub async fn lanelet_by_query(
    store: &State<Arc<dyn LaneletStore>>,
    lanelet: Option<&str>,
) -> Result<BamcheckDownload, LookupError> {
    lookup_lanelet(store, lanelet.unwrap_or_default()).await
}

/// Resolve `lanelet` to its newest bamcheck file and open it for streaming.
pub async fn lookup_lanelet(
    store: &Arc<dyn LaneletStore>,
    lanelet: &str,
) -> Result<BamcheckDownload, LookupError> {
    let Ok(lanelet) = Lanelet::try_from(lanelet) else {
        warn!("request did not name a lanelet");
        return Err(LookupError::NotFound(String::new()));
    };

    info!("executing database query for lanelet {lanelet}...");
    let found = task::spawn_blocking({
        let store = Arc::clone(store);
        let lanelet = lanelet.clone();
        move || store.latest_bamcheck(&lanelet)
    })
    .await
    .map_err(|e| {
        error!("lookup task for lanelet {lanelet} failed: {e}");
        LookupError::Task(e)
    })?
    .map_err(|e| {
        error!("query for lanelet {lanelet} returned error {e}");
        LookupError::Query(e)
    })?;

    let Some(entry) = found else {
        info!("query returned no rows for lanelet {lanelet}");
        return Err(LookupError::NotFound(lanelet.to_string()));
    };

    let path = entry.path().to_path_buf();
    info!("have file {} for lanelet {lanelet}", path.display());

    let metadata = match fs::metadata(&path).await {
        Ok(m) => m,
        Err(source) => {
            error!("could not stat {} for lanelet {lanelet}: {source}", path.display());
            return Err(LookupError::Stat { path, source });
        }
    };

    if !metadata.is_file() {
        error!("{} for lanelet {lanelet} is not a regular file", path.display());
        return Err(LookupError::NotAFile { path });
    }

    let file = match fs::File::open(&path).await {
        Ok(f) => f,
        Err(source) => {
            error!("error opening file {} for lanelet {lanelet}: {source}", path.display());
            return Err(LookupError::Open { path, source });
        }
    };

    Ok(BamcheckDownload {
        size: metadata.len(),
        inner: LoggedFile::new(file, path.clone(), metadata.len()),
        path,
    })
}

/// An opened bamcheck file, sent with its exact length.
#[derive(Debug)]
pub struct BamcheckDownload {
    inner: LoggedFile,
    path: PathBuf,
    size: u64,
}

impl BamcheckDownload {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

impl<'r> Responder<'r, 'static> for BamcheckDownload {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let size = usize::try_from(self.size).ok();

        Response::build()
            .header(ContentType::Plain)
            .sized_body(size, self.inner)
            .ok()
    }
}
