//! # Event Names
//!
//! Named events carried between hops. Each frame's payload is one JSON
//! envelope; the event name tells the receiving endpoint what to do with it.
//!
//! ```text
//!  Server ◀──── vrpc:rtc / rtb / rfc / rfb / nr ──── Client ◀── rtb / rbs / rfb / rns / nr ── View
//!  Server ──── vrpc:rts / rfs / rsb / rnb / nr ────▶ Client ── noreply / creply / sreply ───▶ View
//!                                                           ── ccallback / scallback ──────▶ View
//! ```

/// Fire-and-forget call, understood by every hop.
pub const NOREPLY: &str = "vrpc:nr";

/// Events handled by the server endpoint.
pub mod server {
    /// View request relayed by a client; the reply goes back as `vrpc:rsb`.
    pub const REPLY_TO_BROWSER: &str = "vrpc:rtb";

    /// Client request; the reply goes back as `vrpc:rfs`.
    pub const REPLY_TO_CLIENT: &str = "vrpc:rtc";

    /// Reply from a view to a server call, relayed by a client.
    pub const RECEIVE_FROM_BROWSER: &str = "vrpc:rfb";

    /// Reply from a client to a server call.
    pub const RECEIVE_FROM_CLIENT: &str = "vrpc:rfc";
}

/// Events handled by the client endpoint.
pub mod client {
    /// Request from a hosted view; the reply goes back through `ccallback`.
    pub const REPLY_TO_BROWSER: &str = "vrpc:rtb";

    /// Request from the server; the reply goes back as `vrpc:rfc`.
    pub const REPLY_TO_SERVER: &str = "vrpc:rts";

    /// Reply from a hosted view to a client call.
    pub const RECEIVE_FROM_BROWSER: &str = "vrpc:rfb";

    /// Reply from the server to a client call.
    pub const RECEIVE_FROM_SERVER: &str = "vrpc:rfs";

    /// View fire-and-forget call to forward to the server.
    pub const REDIRECT_NOREPLY_TO_SERVER: &str = "vrpc:rns";

    /// Server fire-and-forget call to forward to a view.
    pub const REDIRECT_NOREPLY_TO_BROWSER: &str = "vrpc:rnb";

    /// View request, or view reply, to forward to the server.
    pub const REDIRECT_BROWSER_TO_SERVER: &str = "vrpc:rbs";

    /// Server request, or server reply, to forward to a view.
    pub const REDIRECT_SERVER_TO_BROWSER: &str = "vrpc:rsb";
}

/// Entry points exposed by an embedded view.
pub mod view {
    pub const NOREPLY: &str = "noreply";

    /// Request from the client.
    pub const CLIENT_REPLY: &str = "creply";

    /// Request from the server.
    pub const SERVER_REPLY: &str = "sreply";

    /// Reply from the client.
    pub const CLIENT_CALLBACK: &str = "ccallback";

    /// Reply from the server.
    pub const SERVER_CALLBACK: &str = "scallback";
}
