//! Shared fixtures and mock-upstream helpers for unit tests.

use axum::Router;
use orbit_core::tle::checksum;
use orbit_core::Tle;

pub(crate) const ISS_LINE1_68: &str =
    "1 25544U 98067A   24001.50000000  .00016717  00000-0  10270-3 0  999";
pub(crate) const ISS_LINE2_68: &str =
    "2 25544  51.6400 247.4627 0006703 130.5360 325.0288 15.4981557142340";

pub(crate) const HST_LINE1_68: &str =
    "1 20580U 90037B   24001.50000000  .00001234  00000-0  56789-4 0  999";
pub(crate) const HST_LINE2_68: &str =
    "2 20580  28.4700 120.3456 0002567  45.1234 315.0000 15.0987654312345";

pub(crate) fn make_line(line68: &str) -> String {
    assert_eq!(line68.len(), 68, "TLE line body must be 68 chars");
    format!("{line68}{}", checksum(line68))
}

/// ISS record in 3-line text form with a trailing newline.
pub(crate) fn iss_text() -> String {
    format!(
        "ISS (ZARYA)\n{}\n{}\n",
        make_line(ISS_LINE1_68),
        make_line(ISS_LINE2_68)
    )
}

/// Two records (ISS + HST) in text form.
pub(crate) fn two_record_text() -> String {
    format!(
        "{}HST\n{}\n{}\n",
        iss_text(),
        make_line(HST_LINE1_68),
        make_line(HST_LINE2_68)
    )
}

pub(crate) fn iss_tle() -> Tle {
    let l1 = make_line(ISS_LINE1_68);
    let l2 = make_line(ISS_LINE2_68);
    Tle::parse(&["ISS (ZARYA)", l1.as_str(), l2.as_str()]).unwrap()
}

/// Binds `app` on an ephemeral port and returns the GP endpoint URL.
pub(crate) async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock upstream");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/NORAD/elements/gp.php")
}
