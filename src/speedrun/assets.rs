//! Asset URI clean-up. speedrun.com hands out `http://` links and extension-less
//! image paths that several Markdown renderers refuse to inline.

pub fn force_https(uri: &str) -> String {
    match uri.strip_prefix("http://") {
        Some(rest) => format!("https://{rest}"),
        None => uri.to_string(),
    }
}

/// `.../cover?v=1` → `.../cover.png?v=1`, applied to the first `/cover`.
pub fn normalize_cover_uri(uri: &str) -> String {
    let uri = force_https(uri.trim());
    let Some(idx) = uri.find("/cover") else {
        return uri;
    };
    let split = idx + "/cover".len();
    if uri[split..].starts_with(".png") {
        return uri;
    }
    format!("{}.png{}", &uri[..split], &uri[split..])
}

/// `.../image?v=1` → `.../image.png?v=1`, applied to the last `/image` only when
/// it ends the path.
pub fn normalize_user_image_uri(uri: &str) -> String {
    let uri = force_https(uri.trim());
    let Some(idx) = uri.rfind("/image") else {
        return uri;
    };
    let split = idx + "/image".len();
    let rest = &uri[split..];
    let ends_path = rest.is_empty() || rest.starts_with('?') || rest.starts_with('#');
    if !ends_path {
        return uri;
    }
    format!("{}.png{}", &uri[..split], rest)
}
