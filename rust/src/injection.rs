//! Scripts injected into the embedded page from the native nav bar.
//!
//! The remote site's DOM is not ours, so each button is modelled as a small program
//! ([`Step`]) over a [`RemotePageContract`]. The same program is rendered to JavaScript
//! for the surface and can be simulated against a [`PageProbe`] in tests.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::state::InjectionTarget;

pub const USERNAME_PLACEHOLDER: &str = "{username}";

const SITE_BASE: &str = "https://www.network.surdurulebilirhasat.org.tr";

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ContractError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
    #[error("invalid profile href pattern: {0}")]
    InvalidPattern(String),
    #[error("profile href pattern uses syntax the page's RegExp does not accept: {0}")]
    UnportablePattern(String),
    #[error("profile href pattern has no capture group")]
    MissingCaptureGroup,
    #[error("messages url template does not contain {{username}}")]
    MissingPlaceholder,
}

/// Selectors, URLs and in-page alert texts the scripts rely on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemotePageContract {
    pub home_url: String,
    pub account_selector: String,
    pub login_selector: String,
    pub profile_href_pattern: String,
    pub messages_url_template: String,
    pub missing_profile_or_login_alert: String,
    pub missing_username_alert: String,
    pub missing_login_alert: String,
}

impl Default for RemotePageContract {
    fn default() -> Self {
        Self {
            home_url: format!("{SITE_BASE}/activity/"),
            account_selector: "li.menu-item.trx_addons_icon-cog a".into(),
            login_selector: "a.trx_addons_popup_link.trx_addons_login_link".into(),
            profile_href_pattern: "members/([^/]+)/profile/edit/".into(),
            messages_url_template: format!("{SITE_BASE}/members/{USERNAME_PLACEHOLDER}/bp-messages/"),
            missing_profile_or_login_alert: "Profil veya Giriş Yap butonu bulunamadı.".into(),
            missing_username_alert: "Kullanıcı adı alınamadı.".into(),
            missing_login_alert: "Giriş Yap butonu bulunamadı.".into(),
        }
    }
}

impl RemotePageContract {
    pub fn validate(&self) -> Result<(), ContractError> {
        let required = [
            ("home_url", &self.home_url),
            ("account_selector", &self.account_selector),
            ("login_selector", &self.login_selector),
            ("profile_href_pattern", &self.profile_href_pattern),
            ("messages_url_template", &self.messages_url_template),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ContractError::Empty { field });
            }
        }
        self.profile_href_regex()?;
        if !self.messages_url_template.contains(USERNAME_PLACEHOLDER) {
            return Err(ContractError::MissingPlaceholder);
        }
        Ok(())
    }

    fn profile_href_regex(&self) -> Result<Regex, ContractError> {
        check_portable_pattern(&self.profile_href_pattern)?;
        let re = Regex::new(&self.profile_href_pattern)
            .map_err(|e| ContractError::InvalidPattern(e.to_string()))?;
        if re.captures_len() < 2 {
            return Err(ContractError::MissingCaptureGroup);
        }
        Ok(re)
    }

    fn login_or_alert(&self, alert: &str) -> Step {
        Step::IfElement {
            selector: self.login_selector.clone(),
            then: Box::new(Step::Click {
                selector: self.login_selector.clone(),
            }),
            otherwise: Box::new(Step::Alert {
                message: alert.to_string(),
            }),
        }
    }

    fn program_for(&self, target: InjectionTarget, href: &Regex) -> Step {
        match target {
            InjectionTarget::Home => Step::Navigate {
                url: self.home_url.clone(),
            },
            InjectionTarget::Profile => Step::IfElement {
                selector: self.account_selector.clone(),
                then: Box::new(Step::Click {
                    selector: self.account_selector.clone(),
                }),
                otherwise: Box::new(self.login_or_alert(&self.missing_profile_or_login_alert)),
            },
            InjectionTarget::Messages => Step::IfElement {
                selector: self.account_selector.clone(),
                then: Box::new(Step::MatchHref {
                    selector: self.account_selector.clone(),
                    pattern: href.clone(),
                    url_template: self.messages_url_template.clone(),
                    on_mismatch: Box::new(Step::Alert {
                        message: self.missing_username_alert.clone(),
                    }),
                }),
                otherwise: Box::new(self.login_or_alert(&self.missing_login_alert)),
            },
        }
    }
}

/// The pattern is compiled by both the `regex` crate (simulation) and the page's
/// `RegExp` (the injected script), so only the syntax both accept is allowed: no inline
/// flags, no `(?P<name>` groups, no `\A`/`\z`/`\p{..}` escapes.
fn check_portable_pattern(pattern: &str) -> Result<(), ContractError> {
    let unportable = |what: &str| -> Result<(), ContractError> {
        Err(ContractError::UnportablePattern(what.to_string()))
    };
    let mut chars = pattern.chars().peekable();
    let mut in_class = false;
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(e @ ('A' | 'z' | 'p' | 'P')) = chars.next() {
                    return unportable(&format!("\\{e}"));
                }
            }
            '[' if !in_class => in_class = true,
            ']' if in_class => in_class = false,
            '(' if !in_class && chars.peek() == Some(&'?') => {
                chars.next();
                match chars.peek() {
                    Some(':') => {}
                    // Named group `(?<name>`; lookbehind is rejected by `regex` anyway.
                    Some('<') => {}
                    Some('P') => return unportable("(?P<name>"),
                    _ => return unportable("inline flags"),
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// One node of an injected program. Every lookup carries its own fallback.
#[derive(Debug, Clone)]
pub enum Step {
    Navigate {
        url: String,
    },
    Click {
        selector: String,
    },
    Alert {
        message: String,
    },
    IfElement {
        selector: String,
        then: Box<Step>,
        otherwise: Box<Step>,
    },
    /// Pulls the first capture of `pattern` out of the element's `href` and navigates to
    /// `url_template` with the capture substituted for `{username}`.
    MatchHref {
        selector: String,
        pattern: Regex,
        url_template: String,
        on_mismatch: Box<Step>,
    },
}

/// What the page can tell a simulated program about itself.
pub trait PageProbe {
    fn exists(&self, selector: &str) -> bool;
    fn href(&self, selector: &str) -> Option<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    Navigate(String),
    Click(String),
    Alert(String),
}

impl Step {
    pub fn simulate(&self, page: &dyn PageProbe) -> PageOutcome {
        match self {
            Step::Navigate { url } => PageOutcome::Navigate(url.clone()),
            Step::Click { selector } => PageOutcome::Click(selector.clone()),
            Step::Alert { message } => PageOutcome::Alert(message.clone()),
            Step::IfElement {
                selector,
                then,
                otherwise,
            } => {
                if page.exists(selector) {
                    then.simulate(page)
                } else {
                    otherwise.simulate(page)
                }
            }
            Step::MatchHref {
                selector,
                pattern,
                url_template,
                on_mismatch,
            } => {
                let href = page.href(selector).unwrap_or_default();
                let username = pattern
                    .captures(&href)
                    .and_then(|caps| caps.get(1))
                    .map(|m| m.as_str())
                    .filter(|name| !name.is_empty());
                match username {
                    Some(name) => {
                        PageOutcome::Navigate(url_template.replace(USERNAME_PLACEHOLDER, name))
                    }
                    None => on_mismatch.simulate(page),
                }
            }
        }
    }

    /// Renders the program as a self-contained script. The trailing `true;` keeps
    /// Android WebViews from complaining about a non-serializable result.
    pub fn to_script(&self) -> String {
        let mut w = ScriptWriter::default();
        w.line("(function() {");
        w.depth += 1;
        w.step(self);
        w.depth -= 1;
        w.line("})();");
        w.line("true;");
        w.out
    }
}

#[derive(Default)]
struct ScriptWriter {
    out: String,
    depth: usize,
    next_var: usize,
    // selector -> variable holding the element, innermost last
    bound: Vec<(String, String)>,
}

impl ScriptWriter {
    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn fresh(&mut self, prefix: &str) -> String {
        let name = format!("{prefix}{}", self.next_var);
        self.next_var += 1;
        name
    }

    fn element(&self, selector: &str) -> String {
        self.bound
            .iter()
            .rev()
            .find(|(sel, _)| sel == selector)
            .map(|(_, var)| var.clone())
            .unwrap_or_else(|| format!("document.querySelector({})", js_string(selector)))
    }

    fn block(&mut self, step: &Step) {
        self.depth += 1;
        self.step(step);
        self.depth -= 1;
    }

    fn step(&mut self, step: &Step) {
        match step {
            Step::Navigate { url } => {
                self.line(&format!("window.location.href = {};", js_string(url)));
            }
            Step::Click { selector } => {
                let el = self.element(selector);
                self.line(&format!("{el}.click();"));
            }
            Step::Alert { message } => {
                self.line(&format!("alert({});", js_string(message)));
            }
            Step::IfElement {
                selector,
                then,
                otherwise,
            } => {
                let var = self.fresh("el");
                self.line(&format!(
                    "var {var} = document.querySelector({});",
                    js_string(selector)
                ));
                self.line(&format!("if ({var}) {{"));
                self.bound.push((selector.clone(), var));
                self.block(then);
                self.bound.pop();
                self.line("} else {");
                self.block(otherwise);
                self.line("}");
            }
            Step::MatchHref {
                selector,
                pattern,
                url_template,
                on_mismatch,
            } => {
                let el = self.element(selector);
                let href = self.fresh("href");
                let found = self.fresh("match");
                self.line(&format!("var {href} = {el}.getAttribute(\"href\") || \"\";"));
                self.line(&format!("var {found} = null;"));
                self.line("try {");
                self.depth += 1;
                self.line(&format!(
                    "{found} = {href}.match(new RegExp({}));",
                    js_string(pattern.as_str())
                ));
                self.depth -= 1;
                self.line("} catch (e) {");
                self.depth += 1;
                self.line(&format!("{found} = null;"));
                self.depth -= 1;
                self.line("}");
                self.line(&format!("if ({found} && {found}[1]) {{"));
                self.depth += 1;
                self.line(&format!(
                    "window.location.href = {}.split({}).join({found}[1]);",
                    js_string(url_template),
                    js_string(USERNAME_PLACEHOLDER)
                ));
                self.depth -= 1;
                self.line("} else {");
                self.block(on_mismatch);
                self.line("}");
            }
        }
    }
}

/// JSON string literals are valid JS string literals once the two line separators
/// JSON leaves raw are escaped.
fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_owned())
        .to_string()
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}

#[derive(Debug, Clone)]
pub struct CompiledScript {
    pub program: Step,
    pub script: String,
}

/// Programs and rendered scripts for every nav bar target, built once per contract.
#[derive(Debug, Clone)]
pub struct ScriptCatalog {
    home: CompiledScript,
    profile: CompiledScript,
    messages: CompiledScript,
}

impl ScriptCatalog {
    pub fn compile(contract: &RemotePageContract) -> Result<Self, ContractError> {
        contract.validate()?;
        let href = contract.profile_href_regex()?;
        let build = |target| {
            let program = contract.program_for(target, &href);
            let script = program.to_script();
            CompiledScript { program, script }
        };
        Ok(Self {
            home: build(InjectionTarget::Home),
            profile: build(InjectionTarget::Profile),
            messages: build(InjectionTarget::Messages),
        })
    }

    pub fn get(&self, target: InjectionTarget) -> &CompiledScript {
        match target {
            InjectionTarget::Home => &self.home,
            InjectionTarget::Profile => &self.profile,
            InjectionTarget::Messages => &self.messages,
        }
    }

    pub fn script(&self, target: InjectionTarget) -> &str {
        &self.get(target).script
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Elements present on a fake page, with their `href` (if any).
    #[derive(Default)]
    struct FakePage {
        elements: HashMap<String, Option<String>>,
    }

    impl FakePage {
        fn with(mut self, selector: &str, href: Option<&str>) -> Self {
            self.elements
                .insert(selector.to_string(), href.map(ToString::to_string));
            self
        }
    }

    impl PageProbe for FakePage {
        fn exists(&self, selector: &str) -> bool {
            self.elements.contains_key(selector)
        }

        fn href(&self, selector: &str) -> Option<String> {
            self.elements.get(selector).cloned().flatten()
        }
    }

    fn catalog() -> (RemotePageContract, ScriptCatalog) {
        let contract = RemotePageContract::default();
        let catalog = ScriptCatalog::compile(&contract).unwrap();
        (contract, catalog)
    }

    #[test]
    fn default_contract_is_valid() {
        RemotePageContract::default().validate().unwrap();
    }

    #[test]
    fn home_navigates_unconditionally() {
        let (contract, catalog) = catalog();
        let outcome = catalog
            .get(InjectionTarget::Home)
            .program
            .simulate(&FakePage::default());
        assert_eq!(outcome, PageOutcome::Navigate(contract.home_url));
    }

    #[test]
    fn messages_extracts_username_from_account_link() {
        let (contract, catalog) = catalog();
        let page = FakePage::default().with(
            &contract.account_selector,
            Some("https://www.network.surdurulebilirhasat.org.tr/members/alice/profile/edit/"),
        );
        let outcome = catalog
            .get(InjectionTarget::Messages)
            .program
            .simulate(&page);
        assert_eq!(
            outcome,
            PageOutcome::Navigate(
                "https://www.network.surdurulebilirhasat.org.tr/members/alice/bp-messages/".into()
            )
        );
    }

    #[test]
    fn messages_alerts_on_malformed_account_link() {
        let (contract, catalog) = catalog();
        let page = FakePage::default()
            .with(&contract.account_selector, Some("/members/alice/settings/"))
            .with(&contract.login_selector, None);
        let outcome = catalog
            .get(InjectionTarget::Messages)
            .program
            .simulate(&page);
        assert_eq!(outcome, PageOutcome::Alert(contract.missing_username_alert));
    }

    #[test]
    fn messages_alerts_when_account_link_has_no_href() {
        let (contract, catalog) = catalog();
        let page = FakePage::default().with(&contract.account_selector, None);
        let outcome = catalog
            .get(InjectionTarget::Messages)
            .program
            .simulate(&page);
        assert_eq!(outcome, PageOutcome::Alert(contract.missing_username_alert));
    }

    #[test]
    fn logged_out_page_falls_back_to_login_link() {
        let (contract, catalog) = catalog();
        let page = FakePage::default().with(&contract.login_selector, Some("#login"));
        for target in [InjectionTarget::Profile, InjectionTarget::Messages] {
            let outcome = catalog.get(target).program.simulate(&page);
            assert_eq!(outcome, PageOutcome::Click(contract.login_selector.clone()));
        }
    }

    #[test]
    fn profile_clicks_account_link_when_logged_in() {
        let (contract, catalog) = catalog();
        let page = FakePage::default()
            .with(&contract.account_selector, Some("/members/bob/profile/edit/"))
            .with(&contract.login_selector, None);
        let outcome = catalog
            .get(InjectionTarget::Profile)
            .program
            .simulate(&page);
        assert_eq!(outcome, PageOutcome::Click(contract.account_selector));
    }

    #[test]
    fn empty_page_alerts_for_profile_and_messages() {
        let (contract, catalog) = catalog();
        let page = FakePage::default();
        assert_eq!(
            catalog
                .get(InjectionTarget::Profile)
                .program
                .simulate(&page),
            PageOutcome::Alert(contract.missing_profile_or_login_alert)
        );
        assert_eq!(
            catalog
                .get(InjectionTarget::Messages)
                .program
                .simulate(&page),
            PageOutcome::Alert(contract.missing_login_alert)
        );
    }

    #[test]
    fn home_script_is_a_single_navigation() {
        let (_, catalog) = catalog();
        assert_eq!(
            catalog.script(InjectionTarget::Home),
            "(function() {\n  window.location.href = \"https://www.network.surdurulebilirhasat.org.tr/activity/\";\n})();\ntrue;\n"
        );
    }

    #[test]
    fn profile_script_reuses_queried_elements() {
        let (_, catalog) = catalog();
        assert_eq!(
            catalog.script(InjectionTarget::Profile),
            concat!(
                "(function() {\n",
                "  var el0 = document.querySelector(\"li.menu-item.trx_addons_icon-cog a\");\n",
                "  if (el0) {\n",
                "    el0.click();\n",
                "  } else {\n",
                "    var el1 = document.querySelector(\"a.trx_addons_popup_link.trx_addons_login_link\");\n",
                "    if (el1) {\n",
                "      el1.click();\n",
                "    } else {\n",
                "      alert(\"Profil veya Giriş Yap butonu bulunamadı.\");\n",
                "    }\n",
                "  }\n",
                "})();\n",
                "true;\n",
            )
        );
    }

    #[test]
    fn messages_script_matches_href_and_substitutes_username() {
        let (_, catalog) = catalog();
        assert_eq!(
            catalog.script(InjectionTarget::Messages),
            concat!(
                "(function() {\n",
                "  var el0 = document.querySelector(\"li.menu-item.trx_addons_icon-cog a\");\n",
                "  if (el0) {\n",
                "    var href1 = el0.getAttribute(\"href\") || \"\";\n",
                "    var match2 = null;\n",
                "    try {\n",
                "      match2 = href1.match(new RegExp(\"members/([^/]+)/profile/edit/\"));\n",
                "    } catch (e) {\n",
                "      match2 = null;\n",
                "    }\n",
                "    if (match2 && match2[1]) {\n",
                "      window.location.href = \"https://www.network.surdurulebilirhasat.org.tr/members/{username}/bp-messages/\".split(\"{username}\").join(match2[1]);\n",
                "    } else {\n",
                "      alert(\"Kullanıcı adı alınamadı.\");\n",
                "    }\n",
                "  } else {\n",
                "    var el3 = document.querySelector(\"a.trx_addons_popup_link.trx_addons_login_link\");\n",
                "    if (el3) {\n",
                "      el3.click();\n",
                "    } else {\n",
                "      alert(\"Giriş Yap butonu bulunamadı.\");\n",
                "    }\n",
                "  }\n",
                "})();\n",
                "true;\n",
            )
        );
    }

    #[test]
    fn href_pattern_must_be_valid_in_both_regex_dialects() {
        let base = RemotePageContract::default();
        for pattern in [
            "(?i)members/([^/]+)/profile/edit/",
            "members/(?i:[^/]+)/(x)",
            "members/(?P<user>[^/]+)/profile/edit/",
            r"\Amembers/([^/]+)/profile/edit/",
            r"members/(\p{L}+)/profile/edit/",
        ] {
            let mut c = base.clone();
            c.profile_href_pattern = pattern.into();
            assert!(
                matches!(c.validate(), Err(ContractError::UnportablePattern(_))),
                "{pattern} accepted"
            );
            assert!(ScriptCatalog::compile(&c).is_err());
        }

        for pattern in [
            "members/([^/]+)/profile/edit/",
            "members/(?:u/)?([^/]+)/profile/edit/",
            "members/(?<user>[^/]+)/profile/edit/",
            r"members/([^/(?i)]+)/profile/edit/",
            r"members/\(?([^/]+)/profile/edit/",
        ] {
            let mut c = base.clone();
            c.profile_href_pattern = pattern.into();
            assert_eq!(c.validate(), Ok(()), "{pattern} rejected");
        }
    }

    #[test]
    fn alert_text_is_escaped_for_js() {
        let mut contract = RemotePageContract::default();
        contract.missing_login_alert = "say \"hi\"\n\u{2028}".into();
        let catalog = ScriptCatalog::compile(&contract).unwrap();
        assert!(catalog
            .script(InjectionTarget::Messages)
            .contains("alert(\"say \\\"hi\\\"\\n\\u2028\");"));
    }

    #[test]
    fn compile_is_deterministic() {
        let contract = RemotePageContract::default();
        let a = ScriptCatalog::compile(&contract).unwrap();
        let b = ScriptCatalog::compile(&contract).unwrap();
        for target in InjectionTarget::ALL {
            assert_eq!(a.script(target), b.script(target));
        }
    }

    #[test]
    fn validate_rejects_broken_contracts() {
        let base = RemotePageContract::default();

        let mut c = base.clone();
        c.login_selector = "  ".into();
        assert_eq!(
            c.validate(),
            Err(ContractError::Empty {
                field: "login_selector"
            })
        );

        let mut c = base.clone();
        c.profile_href_pattern = "members/(".into();
        assert!(matches!(c.validate(), Err(ContractError::InvalidPattern(_))));

        let mut c = base.clone();
        c.profile_href_pattern = "members/[^/]+/profile/edit/".into();
        assert_eq!(c.validate(), Err(ContractError::MissingCaptureGroup));

        let mut c = base;
        c.messages_url_template = "https://example.org/messages/".into();
        assert_eq!(c.validate(), Err(ContractError::MissingPlaceholder));
    }
}
