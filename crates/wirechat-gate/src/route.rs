//! The application's navigation surface.

use std::fmt;

/// Every named view the application can navigate to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteName {
    Login,
    Register,
    Dashboard,
    Chat,
    ChatConversation,
    Templates,
    Flows,
    Campaigns,
    Chatbot,
    ChatbotKeywords,
    ChatbotFlows,
    ChatbotAi,
    Settings,
    Accounts,
    NotFound,
}

const ROUTES: &[(&str, RouteName)] = &[
    ("/login", RouteName::Login),
    ("/register", RouteName::Register),
    ("/", RouteName::Dashboard),
    ("/chat", RouteName::Chat),
    ("/chat/{contact_id}", RouteName::ChatConversation),
    ("/templates", RouteName::Templates),
    ("/flows", RouteName::Flows),
    ("/campaigns", RouteName::Campaigns),
    ("/chatbot", RouteName::Chatbot),
    ("/chatbot/keywords", RouteName::ChatbotKeywords),
    ("/chatbot/flows", RouteName::ChatbotFlows),
    ("/chatbot/ai", RouteName::ChatbotAi),
    ("/settings", RouteName::Settings),
    ("/settings/accounts", RouteName::Accounts),
];

impl RouteName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Register => "register",
            Self::Dashboard => "dashboard",
            Self::Chat => "chat",
            Self::ChatConversation => "chat-conversation",
            Self::Templates => "templates",
            Self::Flows => "flows",
            Self::Campaigns => "campaigns",
            Self::Chatbot => "chatbot",
            Self::ChatbotKeywords => "chatbot-keywords",
            Self::ChatbotFlows => "chatbot-flows",
            Self::ChatbotAi => "chatbot-ai",
            Self::Settings => "settings",
            Self::Accounts => "accounts",
            Self::NotFound => "not-found",
        }
    }

    /// Only the login and registration views are reachable without a session.
    pub fn requires_auth(self) -> bool {
        !matches!(self, Self::Login | Self::Register)
    }
}

impl fmt::Display for RouteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a navigation is headed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationTarget {
    pub name: RouteName,
    /// The requested location, query string included.
    pub full_path: String,
    pub requires_auth: bool,
    /// Set for the chat-with-peer view.
    pub contact_id: Option<String>,
}

/// Resolves paths to routes.
#[derive(Debug, Clone)]
pub struct RouteTable {
    router: matchit::Router<RouteName>,
}

impl RouteTable {
    /// The standard application routes.
    pub fn new() -> Result<Self, RouteError> {
        let mut router = matchit::Router::new();
        for &(path, name) in ROUTES {
            router
                .insert(path, name)
                .map_err(|source| RouteError { path, source })?;
        }
        Ok(Self { router })
    }

    /// Resolve a location such as `/chat/42?tab=media`. Unknown paths resolve
    /// to [`RouteName::NotFound`].
    pub fn resolve(&self, location: &str) -> NavigationTarget {
        let full_path = if location.starts_with('/') {
            location.to_owned()
        } else {
            format!("/{location}")
        };
        let path = normalize(&full_path);

        let (name, contact_id) = match self.router.at(path) {
            Ok(matched) => (
                *matched.value,
                matched.params.get("contact_id").map(str::to_owned),
            ),
            Err(_) => (RouteName::NotFound, None),
        };

        NavigationTarget {
            name,
            requires_auth: name.requires_auth(),
            full_path,
            contact_id,
        }
    }
}

/// Strip query, fragment and trailing slash.
fn normalize(full_path: &str) -> &str {
    let end = full_path.find(['?', '#']).unwrap_or(full_path.len());
    let path = &full_path[..end];
    match path.strip_suffix('/') {
        Some(trimmed) if !trimmed.is_empty() => trimmed,
        _ => path,
    }
}

/// A route pattern could not be registered.
#[derive(Debug, thiserror::Error)]
#[error("invalid route {path}: {source}")]
pub struct RouteError {
    path: &'static str,
    #[source]
    source: matchit::InsertError,
}
