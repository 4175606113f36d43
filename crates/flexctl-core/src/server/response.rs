//! Projection of a provider server into CLI output, and connection strings

use serde::Serialize;
use std::collections::BTreeMap;

use crate::arm::models::Server;
use crate::engine::DatabaseEngine;

/// Shown instead of a password this invocation did not see
pub const MASKED_PASSWORD: &str = "*****";

const PASSWORD_PLACEHOLDER: &str = "{password}";
const USERNAME_PLACEHOLDER: &str = "{username}";
const DATABASE_PLACEHOLDER: &str = "{database}";

/// Flattened view of a created or found server
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerResponse {
    pub host: Option<String>,
    pub username: Option<String>,
    pub password: String,
    #[serde(rename = "skuname")]
    pub sku_name: Option<String>,
    pub location: Option<String>,
    #[serde(rename = "resource group")]
    pub resource_group: String,
    pub id: Option<String>,
    pub version: Option<String>,
}

impl ServerResponse {
    /// Project `server`; `password` is echoed when given, masked otherwise
    pub fn from_server(server: &Server, resource_group: &str, password: Option<&str>) -> Self {
        Self {
            host: server.properties.fully_qualified_domain_name.clone(),
            username: server.properties.administrator_login.clone(),
            password: password.unwrap_or(MASKED_PASSWORD).to_string(),
            sku_name: server.sku.as_ref().map(|s| s.name.clone()),
            location: server.location.clone(),
            resource_group: resource_group.to_string(),
            id: server.id.clone(),
            version: server.properties.version.clone(),
        }
    }

    /// `(Property, Value)` rows in display order
    pub fn table_rows(&self) -> Vec<(&'static str, String)> {
        let value = |v: &Option<String>| v.clone().unwrap_or_default();
        vec![
            ("host", value(&self.host)),
            ("username", value(&self.username)),
            ("password", self.password.clone()),
            ("location", value(&self.location)),
            ("skuname", value(&self.sku_name)),
            ("resource group", self.resource_group.clone()),
            ("id", value(&self.id)),
            ("version", value(&self.version)),
        ]
    }
}

/// Default host name of a flexible server
pub fn server_host(engine: DatabaseEngine, server_name: &str) -> String {
    format!("{}.{}.database.azure.com", server_name, engine.command_group())
}

/// Connection strings for each supported client, keyed by client name
///
/// Missing values render as `{username}`, `{password}` and `{database}` placeholders.
pub fn connection_strings(
    engine: DatabaseEngine,
    server_name: &str,
    admin_user: Option<&str>,
    password: Option<&str>,
    database: Option<&str>,
) -> BTreeMap<&'static str, String> {
    let host = server_host(engine, server_name);
    let user = admin_user.unwrap_or(USERNAME_PLACEHOLDER);
    let password = password.unwrap_or(PASSWORD_PLACEHOLDER);

    let mut strings = BTreeMap::new();
    match engine {
        DatabaseEngine::Mysql => {
            let db = database.unwrap_or(DATABASE_PLACEHOLDER);
            strings.insert(
                "cmd",
                format!("mysql {} --host {} --user {} --password={}", db, host, user, password),
            );
            strings.insert(
                "ado.net",
                format!(
                    "Server={};Database={};Port=3306;User ID={};Password={};",
                    host, db, user, password
                ),
            );
            strings.insert(
                "jdbc",
                format!(
                    "jdbc:mysql://{}:3306/{}?user={}&password={}",
                    host, db, user, password
                ),
            );
            strings.insert(
                "node.js",
                format!(
                    "var conn = mysql.createConnection({{host: '{}', user: '{}', password: '{}', database: '{}', port: 3306}});",
                    host, user, password, db
                ),
            );
            strings.insert(
                "php",
                format!(
                    "$con=mysqli_init(); mysqli_real_connect($con, '{}', '{}', '{}', '{}', 3306);",
                    host, user, password, db
                ),
            );
            strings.insert(
                "python",
                format!(
                    "cnx = mysql.connector.connect(user='{}', password='{}', host='{}', port=3306, database='{}')",
                    user, password, host, db
                ),
            );
            strings.insert(
                "ruby",
                format!(
                    "client = Mysql2::Client.new(username: '{}', password: '{}', database: '{}', host: '{}', port: 3306)",
                    user, password, db, host
                ),
            );
        }
        DatabaseEngine::Postgres => {
            let db = database.unwrap_or("postgres");
            strings.insert(
                "cmd",
                format!(
                    "psql \"host={} port=5432 dbname={} user={} password={} sslmode=require\"",
                    host, db, user, password
                ),
            );
            strings.insert(
                "ado.net",
                format!(
                    "Server={};Database={};Port=5432;User Id={};Password={};Ssl Mode=Require;",
                    host, db, user, password
                ),
            );
            strings.insert(
                "jdbc",
                format!(
                    "jdbc:postgresql://{}:5432/{}?user={}&password={}&sslmode=require",
                    host, db, user, password
                ),
            );
            strings.insert(
                "node.js",
                format!(
                    "var client = new pg.Client('postgres://{}:{}@{}/{}?sslmode=require');",
                    user, password, host, db
                ),
            );
            strings.insert(
                "php",
                format!(
                    "host={} port=5432 dbname={} user={} password={} sslmode=require",
                    host, db, user, password
                ),
            );
            strings.insert(
                "python",
                format!(
                    "cnx = psycopg2.connect(user='{}', password='{}', host='{}', port=5432, database='{}')",
                    user, password, host, db
                ),
            );
            strings.insert(
                "ruby",
                format!(
                    "cnx = PG::Connection.new(:host => '{}', :user => '{}', :dbname => '{}', :port => '5432', :password => '{}')",
                    host, user, db, password
                ),
            );
        }
    }
    strings
}
