// Claves de almacenamiento y recursos compartidos

/// Clave de localStorage donde persiste la cola offline
pub const OFFLINE_QUEUE_KEY: &str = "chauflow_offline_queue";

/// Prefijo de las claves usadas para señalizar cambios entre pestañas
pub const SYNC_EVENT_PREFIX: &str = "chauflow_sync_";

/// Clave de sessionStorage con el identificador de esta pestaña
pub const TAB_ID_KEY: &str = "chauflow_tab_id";

/// Clave de localStorage del filtro de fechas global
pub const GLOBAL_FILTER_KEY: &str = "chauflow_global_date_filter";

/// Clave de localStorage de la sesión de usuario autenticada
pub const SESSION_KEY: &str = "chauflow_session";

/// Recurso externo estable contra el que se sondea la conectividad
pub const PROBE_URL: &str = "https://www.google.com/favicon.ico";

/// Evento DOM que anuncia un cambio del filtro de fechas global
pub const GLOBAL_FILTER_CHANGED_EVENT: &str = "globalFilterChanged";
