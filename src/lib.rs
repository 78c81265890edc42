// Library root
// ------------
// The binary (`main.rs`) parses arguments, sets up logging and hands a
// configured `ApiClient` to the interactive menu in `ui`.
//
// Module responsibilities:
// - `config`: runtime settings and the diagnostic tier.
// - `error`: error taxonomy shared by every layer below the UI.
// - `cookie`: session cookies and their JSON file.
// - `progress`: spinner shown while a request is in flight.
// - `api`: the HTTP wrapper every remote call goes through.
// - `models`: typed records for API payloads.
// - `auth`, `dashboard`, `node`: domain services on top of `api`.
// - `render`: text tables and charts for the terminal.
// - `web`: the local web UI server.
// - `ui`: terminal menus.
pub mod api;
pub mod auth;
pub mod config;
pub mod cookie;
pub mod dashboard;
pub mod error;
pub mod models;
pub mod node;
pub mod progress;
pub mod render;
pub mod ui;
pub mod web;
