//! Region derivation from COS endpoints.

/// Extract the region token from an endpoint string.
///
/// `https://cos.ap-chengdu.myqcloud.com` yields `ap-chengdu`: the endpoint is
/// split on `.` and the second token is taken. Endpoints without any `.` get
/// `fallback`. The token is not validated; an unexpected endpoint shape
/// produces a region the service will reject on first use.
pub fn derive_region(endpoint: &str, fallback: &str) -> String {
    match endpoint.split('.').nth(1) {
        Some(region) => region.to_string(),
        None => fallback.to_string(),
    }
}
