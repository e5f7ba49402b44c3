use crate::config::CorsConfig;
use crate::request::Request;
use crate::response::ResponseControl;

const EXPIRES_IN_PAST: &str = "Fri, 01 Jan 1990 00:00:00 GMT";

/// Stamps the JSON content type, no-cache and credentialed CORS headers that
/// every cookie resource answers with. The request's `Origin` is echoed back
/// since `*` is rejected by browsers for credentialed requests.
pub fn set_no_cache_and_cors_headers(req: &Request, res: &mut ResponseControl, cors: &CorsConfig) {
    let origin = req.origin().unwrap_or(cors.default_origin.as_str());

    res.add_header("Content-Type", "application/json");
    res.add_header("Access-Control-Allow-Credentials", "true");
    res.add_header("Access-Control-Allow-Origin", origin);
    res.add_header("Cache-Control", "no-store");
    res.add_header("Expires", EXPIRES_IN_PAST);
}
