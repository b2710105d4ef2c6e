use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::api::ApiClient;
use crate::attendance::{InFlight, Reconciler};
use crate::auth::{PrincipalStore, RouteTable};
use crate::config::Config;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub principals: PrincipalStore,
    pub api: ApiClient,
    pub routes: Arc<RouteTable>,
    pub reconciler: Reconciler<ApiClient>,
    pub saving: InFlight,
}

impl AppState {
    pub fn new(config: Config, db: DbPool) -> anyhow::Result<Self> {
        let principals = PrincipalStore::new(db);
        let api = ApiClient::new(&config.backend, principals.clone())?;
        let routes = RouteTable::standard()?;
        Ok(Self {
            config,
            principals,
            reconciler: Reconciler::new(api.clone()),
            api,
            routes: Arc::new(routes),
            saving: InFlight::new(),
        })
    }
}
