// UI layer: the interactive menu built on `dialoguer`.
// Each menu entry maps to one handler; a failing handler prints its error
// and control returns to the menu.

use crate::api::ApiClient;
use crate::auth::{self, AuthService};
use crate::config::Config;
use crate::cookie::CookieStore;
use crate::dashboard::DashboardService;
use crate::models::{Node, NodeSponsor, NodeUpdate};
use crate::node::NodeService;
use crate::render;
use crate::web::WebServer;
use anyhow::{Context, Result};
use crossterm::cursor::MoveTo;
use crossterm::execute;
use crossterm::style::Stylize;
use crossterm::terminal::{Clear, ClearType};
use dialoguer::{Confirm, Input, Select};
use std::io::stdout;

struct App {
    config: Config,
    api: ApiClient,
    auth: AuthService,
    dashboard: DashboardService,
    nodes: NodeService,
}

impl App {
    fn new(config: Config, api: ApiClient) -> Self {
        let store = CookieStore::new(&config.cookie_path);
        App {
            auth: AuthService::new(api.clone(), store.clone()),
            dashboard: DashboardService::new(api.clone()),
            nodes: NodeService::new(api.clone(), store),
            config,
            api,
        }
    }
}

/// Main interactive menu. Runs until the user picks "Exit".
pub fn main_menu(config: Config, api: ApiClient) -> Result<()> {
    let app = App::new(config, api);
    let items = [
        "0. Log in with GitHub",
        "1. Show profile",
        "2. Show dashboard",
        "3. Browse my nodes",
        "4. Node leaderboard",
        "5. Open web dashboard",
        "6. Exit",
    ];

    loop {
        clear_screen();
        println!("{}", "Welcome to OpenBMCLAPI!".bold().cyan());
        let selection = Select::new()
            .with_prompt("Choose an action")
            .items(&items)
            .default(0)
            .interact()?;

        let result = match selection {
            0 => handle_login(&app.auth),
            1 => handle_profile(&app.auth),
            2 => handle_dashboard(&app.dashboard),
            3 => handle_nodes(&app.nodes),
            4 => handle_rank(&app.nodes),
            5 => handle_web(&app),
            6 => {
                println!("{}", "Bye!".green());
                break;
            }
            _ => Ok(()),
        };

        if let Err(e) = result {
            println!("{}", format!("✗ {:#}", e).red());
        }
        wait_for_enter()?;
    }
    Ok(())
}

fn clear_screen() {
    let _ = execute!(stdout(), Clear(ClearType::All), MoveTo(0, 0));
}

fn wait_for_enter() -> Result<()> {
    Input::<String>::new()
        .with_prompt("Press Enter to continue")
        .allow_empty(true)
        .interact_text()?;
    Ok(())
}

fn handle_login(auth: &AuthService) -> Result<()> {
    let methods = [
        "GitHub authorization (paste the callback URL)",
        "Paste a cookie string from the browser",
        "Back",
    ];
    let choice = Select::new()
        .with_prompt("Login method")
        .items(&methods)
        .default(0)
        .interact()?;

    match choice {
        0 => {
            let url = auth
                .authorization_url()
                .context("Failed to get the authorization URL")?;
            println!("{}", "✓ Authorization URL ready".green());
            if auth::open_browser(&url).is_err() {
                println!("{}", "Could not open a browser, visit this URL manually:".yellow());
            }
            println!("{}", url.clone().blue());

            let callback: String = Input::new()
                .with_prompt("Paste the callback URL after authorizing")
                .interact_text()?;
            let code = auth::extract_code(callback.trim());
            if code.is_empty() {
                anyhow::bail!("No authorization code found in the pasted URL");
            }
            let cookies = auth.exchange_code(&code).context("Login failed")?;
            println!("{}", format!("✓ Logged in, {} cookies saved", cookies.len()).green());
        }
        1 => {
            let pasted: String = Input::new().with_prompt("Cookie").interact_text()?;
            let cookies = auth.accept_cookie_string(&pasted)?;
            println!("{}", format!("✓ {} cookies saved", cookies.len()).green());
        }
        _ => {}
    }
    Ok(())
}

fn handle_profile(auth: &AuthService) -> Result<()> {
    let profile = auth
        .user_profile()
        .context("Failed to fetch user profile")?;

    println!("{}", "\n✓ Profile".green());
    println!("Name:      {}", profile.name.as_str().cyan());
    println!("GitHub ID: {}", profile.username.as_str().cyan());
    println!("Avatar:    {}", profile.avatar);
    if let Some(bio) = profile.raw_profile.bio.as_deref().filter(|b| !b.is_empty()) {
        println!("Bio:       {}", bio);
    }
    if let Some(blog) = profile.raw_profile.blog.as_deref().filter(|b| !b.is_empty()) {
        println!("Blog:      {}", blog);
    }
    Ok(())
}

fn handle_dashboard(dashboard: &DashboardService) -> Result<()> {
    let data = dashboard
        .dashboard()
        .context("Failed to fetch dashboard")?;
    println!("{}", "\n=== OpenBMCLAPI status ===".bold().green());
    println!("{}", render::dashboard(&data));
    Ok(())
}

fn handle_nodes(nodes: &NodeService) -> Result<()> {
    let list = nodes.list().context("Failed to fetch node list")?;
    if list.is_empty() {
        println!("{}", "You have no nodes yet.".yellow());
        return Ok(());
    }

    loop {
        clear_screen();
        println!("{}", "📡 My nodes".bold().blue());
        let mut items: Vec<String> = list.iter().map(render::node_list_item).collect();
        items.push("Back".to_string());

        let selection = Select::new()
            .with_prompt("Select a node")
            .items(&items)
            .default(0)
            .interact()?;
        if selection == list.len() {
            return Ok(());
        }

        match nodes.detail(&list[selection].id) {
            Ok(node) => node_detail_menu(nodes, node)?,
            Err(e) => {
                println!("{}", format!("✗ Failed to fetch node detail: {}", e).red());
                wait_for_enter()?;
            }
        }
    }
}

fn node_detail_menu(nodes: &NodeService, mut node: Node) -> Result<()> {
    let actions = [
        "Edit node",
        "Edit sponsor",
        "Reset secret",
        "Refresh",
        "Back",
    ];

    loop {
        clear_screen();
        println!("{}", "📝 Node detail".bold().blue());
        println!("{}", render::node_detail(&node));

        let choice = Select::new()
            .with_prompt("Action")
            .items(&actions)
            .default(0)
            .interact()?;

        let outcome = match choice {
            0 => edit_node(nodes, &node),
            1 => edit_sponsor(nodes, &node),
            2 => reset_secret(nodes, &node),
            3 => Ok(true),
            _ => return Ok(()),
        };

        match outcome {
            Ok(true) => match nodes.detail(&node.id) {
                Ok(fresh) => {
                    node = fresh;
                    println!("{}", "✓ Node refreshed".green());
                }
                Err(e) => println!("{}", format!("✗ Refresh failed: {}", e).red()),
            },
            Ok(false) => {}
            Err(e) => println!("{}", format!("✗ {:#}", e).red()),
        }
        wait_for_enter()?;
    }
}

/// Returns whether the node changed and should be refetched.
fn edit_node(nodes: &NodeService, node: &Node) -> Result<bool> {
    let name: String = Input::new()
        .with_prompt("Node name")
        .default(node.name.clone())
        .interact_text()?;
    let bandwidth: i64 = Input::new()
        .with_prompt("Bandwidth limit (Mbps)")
        .default(node.bandwidth)
        .interact_text()?;

    if !Confirm::new()
        .with_prompt("Apply changes?")
        .default(false)
        .interact()?
    {
        return Ok(false);
    }

    nodes
        .update(&node.id, &NodeUpdate { name, bandwidth })
        .context("Update failed")?;
    println!("{}", "✓ Node updated".green());
    Ok(true)
}

fn edit_sponsor(nodes: &NodeService, node: &Node) -> Result<bool> {
    let current = &node.sponsor;
    let name: String = Input::new()
        .with_prompt("Sponsor name")
        .default(current.name.clone())
        .allow_empty(true)
        .interact_text()?;
    let url: String = Input::new()
        .with_prompt("Sponsor URL")
        .default(current.url.clone())
        .allow_empty(true)
        .interact_text()?;
    let banner: String = Input::new()
        .with_prompt("Sponsor banner image")
        .default(current.banner.clone())
        .allow_empty(true)
        .interact_text()?;

    if !Confirm::new()
        .with_prompt("Apply changes?")
        .default(false)
        .interact()?
    {
        return Ok(false);
    }

    nodes
        .update_sponsor(&node.id, NodeSponsor { name, url, banner })
        .context("Sponsor update failed")?;
    println!("{}", "✓ Sponsor update submitted".green());
    println!(
        "{}",
        "Sponsor changes take effect after an administrator reviews them.".yellow()
    );
    Ok(true)
}

fn reset_secret(nodes: &NodeService, node: &Node) -> Result<bool> {
    println!(
        "{}",
        "⚠ Resetting the secret means the node must be reconfigured!".red()
    );
    let confirm: String = Input::new()
        .with_prompt("Type RESET to confirm")
        .allow_empty(true)
        .interact_text()?;
    if confirm.trim() != "RESET" {
        println!("{}", "Reset cancelled".yellow());
        return Ok(false);
    }

    let secret = nodes.reset_secret(&node.id).context("Reset failed")?;
    println!("{}", "✓ Secret reset".green());
    println!("New secret: {}", secret.yellow());
    Ok(false)
}

fn handle_rank(nodes: &NodeService) -> Result<()> {
    let ranks = nodes.rank().context("Failed to fetch leaderboard")?;
    let pages = render::page_count(ranks.len(), render::RANK_PAGE_SIZE).max(1);
    let mut page = 0;

    loop {
        clear_screen();
        println!("{}", "📊 Node leaderboard".bold().blue());
        println!("{}", render::rank_page(&ranks, page, render::RANK_PAGE_SIZE));

        let choice = Select::new()
            .with_prompt("Page")
            .items(&["Next page", "Previous page", "Back"])
            .default(0)
            .interact()?;
        match choice {
            0 if page + 1 < pages => page += 1,
            1 if page > 0 => page -= 1,
            2 => return Ok(()),
            _ => {}
        }
    }
}

fn handle_web(app: &App) -> Result<()> {
    let server = WebServer::start(&app.config, app.api.clone().with_progress(false))
        .context("Failed to start the web server")?;
    let url = server.url();
    println!("{}", format!("Web dashboard running at {}", url).green());
    if auth::open_browser(&url).is_err() {
        println!("Open {} in your browser", url);
    }

    Input::<String>::new()
        .with_prompt("Press Enter to stop the server")
        .allow_empty(true)
        .interact_text()?;
    server.stop()?;
    println!("{}", "Web server stopped".yellow());
    Ok(())
}
