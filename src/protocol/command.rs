//! Command descriptions and request field layout

use super::response::ParsedResponse;

pub const CMD_GET_RANDOM_LOGIN: &str = "GET_RANDOM_LOGIN";
pub const CMD_LOGIN: &str = "LOGIN";
pub const CMD_LOGOUT: &str = "LOGOUT";
pub const CMD_GET_TOKEN: &str = "get_token";
pub const CMD_SET_LOCK_BAND: &str = "TZ_SET_LOCK_BAND";

/// HTTP method a command travels over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// How a command reports success in its parsed body.
///
/// Every rule reads the first occurrence of its key; no command seen so far
/// repeats `result`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuccessSignal {
    /// Any well-formed body
    Any,
    HasField(String),
    /// `result` rendered as text equals this value (`0` and `"0"` both match "0")
    ResultEquals(String),
    /// `result` is numeric and not above this bound
    ResultAtMost(i64),
}

impl SuccessSignal {
    pub fn is_met(&self, response: &ParsedResponse) -> bool {
        match self {
            SuccessSignal::Any => true,
            SuccessSignal::HasField(key) => response.contains(key),
            SuccessSignal::ResultEquals(expected) => {
                response.first_text("result").as_deref() == Some(expected.as_str())
            }
            SuccessSignal::ResultAtMost(bound) => response
                .first_i64("result")
                .map(|v| v <= *bound)
                .unwrap_or(false),
        }
    }
}

/// A single administrative command, immutable once built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    name: String,
    method: Method,
    params: Vec<(String, String)>,
    multi: bool,
    reboots_device: bool,
    success: SuccessSignal,
}

impl Command {
    pub fn get(name: impl Into<String>) -> Self {
        Self::new(name, Method::Get)
    }

    pub fn post(name: impl Into<String>) -> Self {
        Self::new(name, Method::Post)
    }

    /// Batched read of several commands in one exchange (`multi_data=1`)
    pub fn get_multi<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = names
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(",");
        let mut cmd = Self::new(joined, Method::Get);
        cmd.multi = true;
        cmd
    }

    fn new(name: impl Into<String>, method: Method) -> Self {
        Self {
            name: name.into(),
            method,
            params: Vec::new(),
            multi: false,
            reboots_device: false,
            success: SuccessSignal::Any,
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn expect(mut self, success: SuccessSignal) -> Self {
        self.success = success;
        self
    }

    /// Mark the command as one that restarts the router
    pub fn reboots_device(mut self) -> Self {
        self.reboots_device = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn is_multi(&self) -> bool {
        self.multi
    }

    pub fn is_rebooting(&self) -> bool {
        self.reboots_device
    }

    pub fn success_signal(&self) -> &SuccessSignal {
        &self.success
    }

    /// `cmd=<name>&isTest=false[&multi_data=1]` followed by the extra params
    pub(crate) fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("cmd".to_string(), self.name.clone()),
            ("isTest".to_string(), "false".to_string()),
        ];
        if self.multi {
            pairs.push(("multi_data".to_string(), "1".to_string()));
        }
        pairs.extend(self.params.iter().cloned());
        pairs
    }

    /// Extra params, then `isTest` and `goformId`, then `CSRFToken` only when
    /// a token was issued
    pub(crate) fn form_pairs(&self, csrf_token: Option<&str>) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .params
            .iter()
            .filter(|(k, _)| !is_reserved_form_key(k))
            .cloned()
            .collect();
        pairs.push(("isTest".to_string(), "false".to_string()));
        pairs.push(("goformId".to_string(), self.name.clone()));
        if let Some(token) = csrf_token {
            pairs.push(("CSRFToken".to_string(), token.to_string()));
        }
        pairs
    }
}

fn is_reserved_form_key(key: &str) -> bool {
    matches!(key, "isTest" | "goformId" | "CSRFToken")
}
