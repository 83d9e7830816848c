//! Notification documents built from webhook events.
//!
//! Rendering is pure: it only reads the event and produces subject + HTML, so
//! the same document can be handed to every recipient and inspected in tests
//! without a transport.

use std::fmt::Write as _;

use chainwatch_domain::model::{
    Block, Erc20Transfer, MalformedEventError, NativeTransaction, NftTransfer, NotificationKind,
    WatchedAddress, WebhookEvent,
};
use chrono::DateTime;
use primitive_types::U256;

/// Decimals of the chain's native unit (wei → ether).
pub const NATIVE_DECIMALS: u32 = 18;
/// Native amounts always show at least this many fractional digits.
pub const NATIVE_MIN_FRACTION_DIGITS: usize = 4;

const DEFAULT_EXPLORER_TX_URL: &str = "https://etherscan.io/tx/";

/// A rendered, recipient-independent message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    explorer_tx_url: String,
}

impl RenderOptions {
    pub fn new(explorer_tx_url: impl Into<String>) -> Self {
        Self {
            explorer_tx_url: explorer_tx_url.into(),
        }
    }

    fn tx_link(&self, hash: &str) -> String {
        let hash = escape_html(hash);
        format!(
            r#"<a href="{}{hash}" target="_blank">{hash}</a>"#,
            escape_html(&self.explorer_tx_url)
        )
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::new(DEFAULT_EXPLORER_TX_URL)
    }
}

/// Builds the activity notification for a notifiable event.
pub fn render_activity(
    event: &WebhookEvent,
    kind: NotificationKind,
    options: &RenderOptions,
) -> Result<Notification, MalformedEventError> {
    let block = event
        .block
        .as_ref()
        .ok_or(MalformedEventError::MissingField("block"))?;
    let tag = display_tag(&event.tag);

    let (subject, heading) = match kind {
        NotificationKind::Confirmed => (
            format!("🔔 Activity on {tag}"),
            "🔔 On-chain Activity Detected",
        ),
        NotificationKind::FirstUnconfirmed => (
            format!("⏳ Pending activity on {tag}"),
            "⏳ Pending On-chain Activity",
        ),
    };

    let mut html = String::new();
    let _ = writeln!(html, "<h2>{heading}</h2>");
    if kind == NotificationKind::FirstUnconfirmed {
        html.push_str(
            "<p><em>This activity has not been confirmed yet and may still be reverted.</em></p>\n",
        );
    }
    push_header(&mut html, &tag, block);

    if let Some(tx) = event.primary_transaction() {
        push_native_transaction(&mut html, tx, options)?;
    }
    if !event.erc20_transfers.is_empty() {
        push_erc20_transfers(&mut html, &event.erc20_transfers, options)?;
    }
    if !event.nft_transfers.is_empty() {
        push_nft_transfers(&mut html, &event.nft_transfers, options);
    }

    Ok(Notification { subject, html })
}

/// Message sent right after a successful subscription.
pub fn render_subscription_confirmation(address: &WatchedAddress) -> Notification {
    let address = address.as_str();
    Notification {
        subject: format!("✅ Subscribed to on-chain alerts for {address}"),
        html: format!(
            "<h2>Subscription Confirmed!</h2>\n\
             <p>You will now receive email alerts whenever <strong>{address}</strong> does any on-chain activity.</p>\n\
             <p>Thank you for using our service.</p>\n"
        ),
    }
}

fn push_header(html: &mut String, tag: &str, block: &Block) {
    let time = format_block_time(block.timestamp.as_deref());
    let number = escape_html(block.number.as_deref().unwrap_or("unknown"));
    let hash = escape_html(block.hash.as_deref().unwrap_or("unknown"));
    let _ = writeln!(html, "<p><strong>Address:</strong> {}</p>", escape_html(tag));
    let _ = writeln!(html, "<p><strong>Time:</strong> {time}</p>");
    let _ = writeln!(
        html,
        "<p><strong>Block:</strong> {number} (<code>{hash}</code>)</p>"
    );
}

fn push_native_transaction(
    html: &mut String,
    tx: &NativeTransaction,
    options: &RenderOptions,
) -> Result<(), MalformedEventError> {
    let hash = tx
        .hash
        .as_deref()
        .filter(|hash| !hash.is_empty())
        .ok_or(MalformedEventError::MissingField("txs[0].hash"))?;
    let raw_value = tx.value.as_deref().unwrap_or("0");
    let value = format_units(raw_value, NATIVE_DECIMALS, NATIVE_MIN_FRACTION_DIGITS).ok_or_else(
        || MalformedEventError::InvalidAmount {
            field: "txs[0].value",
            value: raw_value.to_string(),
        },
    )?;

    html.push_str("<h3>Native Transaction</h3>\n");
    html.push_str(
        r#"<table border="1" cellpadding="5" cellspacing="0" style="border-collapse:collapse;">"#,
    );
    html.push('\n');
    let _ = writeln!(html, "<tr><th>Hash</th><td>{}</td></tr>", options.tx_link(hash));
    let _ = writeln!(html, "<tr><th>From</th><td>{}</td></tr>", field(&tx.from_address));
    let _ = writeln!(html, "<tr><th>To</th><td>{}</td></tr>", field(&tx.to_address));
    let _ = writeln!(html, "<tr><th>Value</th><td>{value} ETH</td></tr>");
    let _ = writeln!(
        html,
        "<tr><th>Gas Used</th><td>{}</td></tr>",
        field(&tx.receipt_gas_used)
    );
    html.push_str("</table>\n");
    Ok(())
}

fn push_erc20_transfers(
    html: &mut String,
    transfers: &[Erc20Transfer],
    options: &RenderOptions,
) -> Result<(), MalformedEventError> {
    html.push_str("<h3>ERC-20 Transfers</h3>\n");
    for transfer in transfers {
        let decimals = transfer
            .token_decimals
            .as_deref()
            .and_then(|raw| raw.trim().parse::<u8>().ok())
            .map(u32::from)
            .unwrap_or(NATIVE_DECIMALS);
        let raw_value = transfer.value.as_deref().unwrap_or("0");
        let amount = format_units(raw_value, decimals, 0).ok_or_else(|| {
            MalformedEventError::InvalidAmount {
                field: "erc20Transfers.value",
                value: raw_value.to_string(),
            }
        })?;
        let symbol = transfer
            .token_symbol
            .as_deref()
            .filter(|symbol| !symbol.is_empty())
            .map(escape_html)
            .unwrap_or_else(|| "tokens".to_string());
        let _ = writeln!(
            html,
            "<p>{} → {}, {amount} {symbol}<br>{}</p>",
            field(&transfer.from),
            field(&transfer.to),
            optional_link(&transfer.transaction_hash, options),
        );
    }
    Ok(())
}

fn push_nft_transfers(html: &mut String, transfers: &[NftTransfer], options: &RenderOptions) {
    html.push_str("<h3>NFT Transfers</h3>\n");
    for transfer in transfers {
        let _ = writeln!(
            html,
            "<p>{} → {}, TokenID: {}<br>{}</p>",
            field(&transfer.from),
            field(&transfer.to),
            field(&transfer.token_id),
            optional_link(&transfer.transaction_hash, options),
        );
    }
}

fn display_tag(tag: &str) -> String {
    let tag = tag.trim();
    if tag.is_empty() {
        "your watched address".to_string()
    } else {
        tag.to_string()
    }
}

fn field(value: &Option<String>) -> String {
    value
        .as_deref()
        .map(escape_html)
        .unwrap_or_else(|| "n/a".to_string())
}

fn optional_link(hash: &Option<String>, options: &RenderOptions) -> String {
    match hash.as_deref().filter(|hash| !hash.is_empty()) {
        Some(hash) => options.tx_link(hash),
        None => String::new(),
    }
}

/// Formats an integer amount of base units as a decimal string with thousands
/// separators, keeping every significant fractional digit and padding to
/// `min_fraction_digits`. Amounts cover the full uint256 range. Returns `None`
/// for non-decimal input or values wider than 256 bits.
pub fn format_units(raw: &str, decimals: u32, min_fraction_digits: usize) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    let value = U256::from_dec_str(raw).ok()?;

    // 10^decimals beyond 256 bits exceeds every representable value.
    let (whole, remainder) = match U256::from(10u8).checked_pow(U256::from(decimals)) {
        Some(divisor) => value.div_mod(divisor),
        None => (U256::zero(), value),
    };

    let mut fraction = if decimals == 0 {
        String::new()
    } else {
        format!("{:0>width$}", remainder.to_string(), width = decimals as usize)
    };
    while fraction.len() > min_fraction_digits && fraction.ends_with('0') {
        fraction.pop();
    }
    while fraction.len() < min_fraction_digits {
        fraction.push('0');
    }

    let whole = group_thousands(&whole.to_string());
    if fraction.is_empty() {
        Some(whole)
    } else {
        Some(format!("{whole}.{fraction}"))
    }
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

/// Unix seconds rendered in HTTP-date style, e.g. `Tue, 14 Nov 2023 22:13:20 GMT`.
fn format_block_time(timestamp: Option<&str>) -> String {
    timestamp
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|time| time.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
