/// Outgoing response under construction. Headers are byte-string pairs kept
/// in insertion order; repeated names each become their own header line.
#[derive(Debug, Clone)]
pub struct ResponseControl {
    pub status_code: u16,
    pub headers: Vec<(String, Vec<u8>)>,
    pub body: Vec<u8>,
}

impl ResponseControl {
    pub fn new() -> Self {
        Self {
            status_code: 200,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn add_header(&mut self, name: &str, value: impl Into<Vec<u8>>) {
        self.headers.push((name.to_string(), value.into()));
    }

    pub fn header_values<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a [u8]> + 'a {
        let name = name.to_owned();
        self.headers
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(&name))
            .map(|(_, v)| v.as_slice())
    }

    pub fn first_header(&self, name: &str) -> Option<&[u8]> {
        self.header_values(name).next()
    }

    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) {
        self.body = body.into();
    }
}

impl Default for ResponseControl {
    fn default() -> Self {
        Self::new()
    }
}
