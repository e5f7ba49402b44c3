use std::collections::HashMap;

/// Decoded query parameters. Blank values are kept and the first value of a
/// repeated key wins.
#[derive(Debug, Clone, Default)]
pub struct Params(HashMap<String, String>);

impl Params {
    pub fn parse(query: &str) -> Self {
        let mut map = HashMap::new();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if key.is_empty() {
                continue;
            }
            map.entry(key.into_owned())
                .or_insert_with(|| value.into_owned());
        }
        Params(map)
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.0.get(key)
    }
}

/// Request headers keyed by lowercased name. Repeated fields are folded into
/// one value: `cookie` crumbs joined with `"; "`, anything else with `", "`.
#[derive(Debug, Clone, Default)]
pub struct Headers(HashMap<String, String>);

impl Headers {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut map: HashMap<String, String> = HashMap::new();
        for (name, value) in pairs {
            let name = name.as_ref().to_lowercase();
            let value = value.into();
            match map.get_mut(&name) {
                Some(existing) => {
                    existing.push_str(if name == "cookie" { "; " } else { ", " });
                    existing.push_str(&value);
                }
                None => {
                    map.insert(name, value);
                }
            }
        }
        Headers(map)
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.0.get(&key.to_lowercase())
    }
}

/// Cookies sent by the client, as raw `name=value` pairs from the `Cookie`
/// header in the order sent. Values are not decoded.
#[derive(Debug, Clone, Default)]
pub struct Cookies(Vec<(String, String)>);

impl Cookies {
    pub fn parse(header: &str) -> Self {
        let mut pairs: Vec<(String, String)> = Vec::new();
        for c in header.split(';') {
            let c = c.trim();
            let mut parts = c.splitn(2, '=');
            let name = match parts.next() {
                Some(n) if !n.trim().is_empty() => n.trim().to_string(),
                _ => continue,
            };
            if pairs.iter().any(|(n, _)| *n == name) {
                continue;
            }
            let value = parts.next().unwrap_or("").trim().to_string();
            pairs.push((name, value));
        }
        Cookies(pairs)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Request {
    pub get: Params,
    pub cookie: Cookies,
    pub ua: Headers,
    method: String,
    path: String,
}

impl Request {
    pub fn new(method: &str, path: &str, query: &str, headers: Headers) -> Self {
        let cookie = headers
            .get("cookie")
            .map(|c| Cookies::parse(c))
            .unwrap_or_default();

        Request {
            get: Params::parse(query),
            cookie,
            ua: headers,
            method: method.to_string(),
            path: path.to_string(),
        }
    }

    /// A bare GET request carrying only a query string.
    pub fn from_query(query: &str) -> Self {
        Request::new("GET", "/", query, Headers::default())
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn origin(&self) -> Option<&str> {
        self.ua.get("origin").map(|s| s.as_str())
    }
}
