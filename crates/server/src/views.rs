//! Server-rendered HTML pages

use persistence::repository::{SignalRecord, WhaleRecord};
use std::fmt::Write;

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{title} | Agora Watcher</title>
  <link rel="stylesheet" href="/static/style.css">
</head>
<body>
  <nav><a href="/">Signals</a> <a href="/whales">Whales</a></nav>
  <main>
{body}
  </main>
</body>
</html>
"#,
        title = escape(title),
    )
}

/// Landing page. Signal cards and the bankroll panel are filled in by the
/// browser from the JSON endpoints.
pub fn index_page(operator: &str) -> String {
    let body = format!(
        r#"    <h1>Welcome back, {operator}</h1>
    <section id="bankroll" class="panel">Loading bankroll...</section>
    <section id="signals" class="grid"></section>
    <script>
      fetch('/api/bankroll').then(r => r.json()).then(b => {{
        document.getElementById('bankroll').textContent =
          `Balance $${{b.balance.toFixed(2)}} | Today +$${{b.profit_today.toFixed(2)}} | ${{b.status}} | ${{b.signals_today}} signals | ${{b.last_update}}`;
      }});
      fetch('/api/signals').then(r => r.json()).then(signals => {{
        const grid = document.getElementById('signals');
        for (const s of signals) {{
          const card = document.createElement('a');
          card.className = 'card';
          card.href = '/signal/' + encodeURIComponent(s.id);
          card.textContent = `[${{s.category}}] ${{s.market}} - ${{s.recommendation}} (${{s.confidence}}%)`;
          grid.appendChild(card);
        }}
      }});
    </script>"#,
        operator = escape(operator),
    );
    layout("Dashboard", &body)
}

/// Whale leaderboard, rows in the order given
pub fn whales_page(whales: &[WhaleRecord]) -> String {
    let mut rows = String::new();
    for whale in whales {
        let _ = writeln!(
            rows,
            r#"      <tr class="status-{status_class}"><td>{alias}</td><td><code>{address}</code></td><td>${profit:.2}</td><td>{last_trade}</td><td>{status}</td></tr>"#,
            status_class = escape(&whale.status.to_lowercase()),
            alias = escape(&whale.alias),
            address = escape(&whale.address),
            profit = whale.total_profit,
            last_trade = escape(&whale.last_trade),
            status = escape(&whale.status),
        );
    }

    let body = format!(
        r#"    <h1>Whale Watch</h1>
    <table>
      <thead><tr><th>Alias</th><th>Address</th><th>Total Profit</th><th>Last Trade</th><th>Status</th></tr></thead>
      <tbody>
{rows}      </tbody>
    </table>"#
    );
    layout("Whales", &body)
}

pub fn signal_page(signal: &SignalRecord) -> String {
    let character = match (&signal.char_name, &signal.char_class) {
        (Some(name), Some(class)) => format!("{} &middot; {}", escape(name), escape(class)),
        (Some(name), None) => escape(name),
        (None, Some(class)) => escape(class),
        (None, None) => String::new(),
    };
    let rarity = signal
        .rarity
        .as_deref()
        .map(|r| format!(r#" <span class="rarity">{}</span>"#, escape(r)))
        .unwrap_or_default();

    let body = format!(
        r#"    <article class="signal">
      <p class="category">{category}{rarity}</p>
      <h1>{market}</h1>
      <p class="character">{character}</p>
      <p class="recommendation">{recommendation}</p>
      <p>{analysis}</p>
      <dl>
        <dt>Confidence</dt><dd>{confidence}%</dd>
        <dt>Bet</dt><dd>${bet:.2}</dd>
        <dt>Est. profit</dt><dd>${profit:.2}</dd>
        <dt>Posted</dt><dd>{timestamp}</dd>
      </dl>
      <a class="button" href="{url}" rel="noopener" target="_blank">Open market</a>
    </article>"#,
        category = escape(&signal.category),
        market = escape(&signal.market),
        recommendation = escape(&signal.recommendation),
        analysis = escape(&signal.analysis),
        confidence = signal.confidence,
        bet = signal.bet_amount,
        profit = signal.est_profit,
        timestamp = escape(signal.timestamp.as_deref().unwrap_or("")),
        url = escape(&signal.url),
    );
    layout(&signal.market, &body)
}
