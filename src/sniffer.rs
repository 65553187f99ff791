//! In-page instrumentation for media discovery.
//!
//! All per-episode discovery logic lives inside the page: the script hooks
//! XHR/fetch, watches `<video>` and `<iframe>` elements, keeps an append-only
//! event log and exposes first-match slots the host polls via `Tab::evaluate`.
//! The host never parses page HTML directly, and cannot receive in-page
//! callbacks, so `window.waitForVideo` is a promise backed by a polling loop
//! rather than a push notification.

/// Injected once per page load. Idempotent: re-injection on an already
/// instrumented page is a no-op thanks to the `__sniffer_ready` guard.
pub const SNIFFER_JS: &str = r#"(() => {
    if (window.__sniffer_ready) return;
    window.__sniffer_ready = true;
    window.__sniffer_events = [];

    const push_event = (kind, info) => {
        try {
            window.__sniffer_events.push({ kind, info, ts: Date.now() });
            if (kind === 'video-xhr' || kind === 'video-element') window.__video_found = info;
            if (kind === 'subtitle-xhr') window.__sub_found = info;
        } catch (e) {}
    };

    // Hook XMLHttpRequest
    const orig_open = XMLHttpRequest.prototype.open;
    const orig_send = XMLHttpRequest.prototype.send;
    XMLHttpRequest.prototype.open = function(m, u) { this.__url = u; return orig_open.apply(this, arguments); };
    XMLHttpRequest.prototype.send = function() {
        const url = this.__url || "";
        this.addEventListener('load', function() {
            const type = this.getResponseHeader('content-type') || "";
            if (url.includes('.m3u8') || url.includes('/hls') || type.includes('application/vnd.apple.mpegurl'))
                push_event('video-xhr', { url });
            else if (url.includes('/api/Sub/'))
                push_event('subtitle-xhr', { url });
        });
        return orig_send.apply(this, arguments);
    };

    // Hook fetch
    const orig_fetch = window.fetch;
    window.fetch = async (i, init) => {
        const req_url = typeof i === 'string' ? i : (i && i.url) || "";
        try {
            if (req_url && (req_url.includes('.m3u8') || req_url.includes('/hls')))
                push_event('video-xhr', { url: req_url });
        } catch (e) {}
        const resp = await orig_fetch(i, init);
        try {
            const type = resp && resp.headers && resp.headers.get ? (resp.headers.get('content-type') || "") : "";
            if (type.includes('application/vnd.apple.mpegurl'))
                push_event('video-xhr', { url: req_url });
        } catch (e) {}
        return resp;
    };

    // Watch <video> elements, existing and added later
    const watch_video = v => {
        if (!v || v.__watched) return;
        v.__watched = true;
        const report = () => {
            const s = v.currentSrc || v.src || "";
            if (s.includes('.mp4') || s.includes('.m3u8')) push_event('video-element', { url: s });
            else if (s.startsWith('blob:')) push_event('video-blob', { url: s });
        };
        report();
        v.addEventListener('loadedmetadata', report);
        new MutationObserver(report).observe(v, { attributes: true, attributeFilter: ['src'] });
    };
    document.querySelectorAll('video').forEach(watch_video);

    // Watch <iframe> src / data-src for player or countdown pages
    const is_player_or_countdown = src => {
        if (!src || typeof src !== 'string') return false;
        const s = src.toLowerCase();
        return s.includes('countdown') || s.includes('tickcounter') || s.includes('/player/') || s.includes('.m3u8') || s.includes('/hls');
    };

    const normalize_url = u => {
        if (!u) return '';
        if (u.startsWith('//')) return 'https:' + u;
        return u;
    };

    const watch_iframe = ifr => {
        if (!ifr || ifr.__iframe_watched) return;
        ifr.__iframe_watched = true;
        const report = () => {
            try {
                const src = ifr.getAttribute('src') || "";
                const data_src = ifr.getAttribute('data-src') || "";
                const final_src = normalize_url(src || data_src);
                if (is_player_or_countdown(final_src)) {
                    push_event('video-element', { url: final_src });
                }
            } catch (e) {}
        };
        report();
        new MutationObserver(() => report()).observe(ifr, { attributes: true, attributeFilter: ['src', 'data-src'] });
    };
    document.querySelectorAll('iframe').forEach(watch_iframe);

    // Watch dynamically added nodes
    new MutationObserver(muts => {
        muts.forEach(m => {
            m.addedNodes.forEach(n => {
                try {
                    const tag = (n && n.tagName) ? n.tagName.toUpperCase() : '';
                    if (tag === 'VIDEO') watch_video(n);
                    if (tag === 'IFRAME') watch_iframe(n);
                    if (n.querySelectorAll) {
                        n.querySelectorAll('video').forEach(watch_video);
                        n.querySelectorAll('iframe').forEach(watch_iframe);
                    }
                } catch (e) {}
            });
        });
    }).observe(document.body, { childList: true, subtree: true });

    // Awaitable slot: resolves to the first video-kind event, immediately if
    // one already happened, otherwise on the next qualifying event.
    window.waitForVideo = new Promise(resolve => {
        const check = () => {
            if (window.__video_found) return resolve(window.__video_found);
            try {
                for (const ev of window.__sniffer_events) {
                    if (ev && (ev.kind === 'video-element' || ev.kind === 'video-xhr')) {
                        window.__video_found = ev.info;
                        return resolve(ev.info);
                    }
                }
            } catch (e) {}
            setTimeout(check, 500);
        };
        check();
    });
})()"#;

/// Muted autoplay nudge, issued once per page load so the player starts
/// producing network/DOM activity without an audio permission prompt.
pub const AUTOPLAY_NUDGE_JS: &str =
    r#"(() => { const v = document.querySelector('video'); if (v) { v.muted = true; v.play && v.play().catch(() => {}); } })()"#;

/// Awaits the first video-kind event and resolves to its URL string.
/// Evaluated with `await_promise` so the host blocks on the in-page slot.
pub const AWAIT_VIDEO_JS: &str =
    r#"window.waitForVideo.then(info => (info && info.url) ? info.url : '')"#;

/// Reads the subtitle endpoint path sniffed so far, or the empty string.
pub const SUBTITLE_SLOT_JS: &str =
    r#"window.__sub_found && window.__sub_found.url ? window.__sub_found.url : ''"#;

/// Event kinds recorded by the in-page log. Only the first video-kind and
/// first subtitle-kind event are ever consumed by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SniffKind {
    VideoXhr,
    VideoElement,
    VideoBlob,
    SubtitleXhr,
}

impl SniffKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SniffKind::VideoXhr => "video-xhr",
            SniffKind::VideoElement => "video-element",
            SniffKind::VideoBlob => "video-blob",
            SniffKind::SubtitleXhr => "subtitle-xhr",
        }
    }
}

/// Extract a non-empty string from an evaluated remote object's value.
pub fn remote_string(value: Option<serde_json::Value>) -> Option<String> {
    match value {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_is_idempotent_guarded() {
        // the guard must be checked before it is set
        let guard_check = SNIFFER_JS.find("if (window.__sniffer_ready) return").unwrap();
        let guard_set = SNIFFER_JS.find("window.__sniffer_ready = true").unwrap();
        assert!(guard_check < guard_set);
    }

    #[test]
    fn test_script_covers_all_event_kinds() {
        for kind in [
            SniffKind::VideoXhr,
            SniffKind::VideoElement,
            SniffKind::VideoBlob,
            SniffKind::SubtitleXhr,
        ] {
            assert!(
                SNIFFER_JS.contains(kind.as_str()),
                "missing event kind {}",
                kind.as_str()
            );
        }
    }

    #[test]
    fn test_nudge_is_muted() {
        assert!(AUTOPLAY_NUDGE_JS.contains("v.muted = true"));
    }

    #[test]
    fn test_remote_string_extraction() {
        let found = Some(serde_json::Value::String("https://x/v.m3u8".into()));
        assert_eq!(remote_string(found).as_deref(), Some("https://x/v.m3u8"));

        assert!(remote_string(Some(serde_json::Value::String(String::new()))).is_none());
        assert!(remote_string(Some(serde_json::Value::Null)).is_none());
        assert!(remote_string(None).is_none());
    }
}
