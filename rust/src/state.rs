#[derive(uniffi::Record, Clone, Debug)]
pub struct AppState {
    pub rev: u64,
    pub view: ViewState,
    pub splash: SplashConfig,
    pub surface: SurfaceConfig,
    pub can_go_back: bool,
    pub current_url: Option<String>,
    pub is_connected: bool,
    pub offline_message: String,
    pub nav_bar: Vec<NavBarItem>,
    pub exit_prompt: Option<ExitPrompt>,
}

impl AppState {
    pub fn empty() -> Self {
        Self {
            rev: 0,
            view: ViewState::Splash,
            splash: SplashConfig {
                media_resource: String::new(),
                looping: false,
            },
            surface: SurfaceConfig::for_url(String::new()),
            can_go_back: false,
            current_url: None,
            // Optimistic until the first connectivity report arrives.
            is_connected: true,
            offline_message: String::new(),
            nav_bar: NavBarItem::defaults(),
            exit_prompt: None,
        }
    }
}

/// Which top-level layer the shell is presenting.
///
/// `Splash` only ever moves forward to `Content`; there is no way back.
#[derive(uniffi::Enum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewState {
    Splash,
    Content,
}

#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq)]
pub struct SplashConfig {
    pub media_resource: String,
    pub looping: bool,
}

/// How the host must configure the embedded browser surface.
///
/// Cookies are shared and persisted so a login on the remote site survives restarts.
#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq)]
pub struct SurfaceConfig {
    pub url: String,
    pub javascript_enabled: bool,
    pub dom_storage_enabled: bool,
    pub shared_cookies_enabled: bool,
    pub third_party_cookies_enabled: bool,
    pub incognito: bool,
}

impl SurfaceConfig {
    pub fn for_url(url: String) -> Self {
        Self {
            url,
            javascript_enabled: true,
            dom_storage_enabled: true,
            shared_cookies_enabled: true,
            third_party_cookies_enabled: true,
            incognito: false,
        }
    }
}

#[derive(uniffi::Enum, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InjectionTarget {
    Home,
    Profile,
    Messages,
}

impl InjectionTarget {
    pub const ALL: [InjectionTarget; 3] = [
        InjectionTarget::Home,
        InjectionTarget::Profile,
        InjectionTarget::Messages,
    ];

    pub fn icon(&self) -> &'static str {
        match self {
            InjectionTarget::Home => "home",
            InjectionTarget::Profile => "person",
            InjectionTarget::Messages => "chatbubble",
        }
    }
}

#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq)]
pub struct NavBarItem {
    pub target: InjectionTarget,
    pub icon: String,
}

impl NavBarItem {
    pub fn defaults() -> Vec<Self> {
        InjectionTarget::ALL
            .iter()
            .map(|target| NavBarItem {
                target: *target,
                icon: target.icon().to_string(),
            })
            .collect()
    }
}

/// Two-choice modal shown when back is pressed with no page history left.
#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq)]
pub struct ExitPrompt {
    pub title: String,
    pub message: String,
    pub cancel_label: String,
    pub confirm_label: String,
}
