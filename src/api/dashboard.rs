// =============================================================================
// Dashboard — static scanner page served at `/`
// =============================================================================

/// Single-file dashboard: interval picker, OI scan and combined scan buttons,
/// results table fed from the JSON endpoints.
pub const DASHBOARD_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>OI + Volume Change Scanner</title>
    <style>
        body { font-family: Arial; background: #f9f9f9; padding: 20px; }
        h1 { color: #333; }
        select, button { padding: 10px; margin-top: 10px; }
        table { width: 100%; margin-top: 20px; border-collapse: collapse; }
        th, td { border: 1px solid #ccc; padding: 10px; text-align: center; }
        th { background: #333; color: white; }
        tr:nth-child(even) { background: #eee; }
    </style>
</head>
<body>
    <h1>Open Interest &amp; Volume Tracker</h1>
    <label for="interval">Select Interval:</label>
    <select id="interval">
        <option value="1h">1 Hour</option>
        <option value="4h">4 Hours</option>
        <option value="24h">24 Hours</option>
    </select>
    <button onclick="scanOi()">Scan OI</button>
    <button onclick="scanCombined()">Scan OI + Volume</button>
    <table>
        <thead>
            <tr>
                <th>Symbol</th>
                <th>OI Change (%)</th>
                <th>Volume Change (%)</th>
                <th>Current OI</th>
                <th>Previous OI</th>
                <th>Current Vol</th>
                <th>Previous Vol</th>
            </tr>
        </thead>
        <tbody id="results">
        </tbody>
    </table>
    <script>
        function fmt(x) {
            return Number(x).toFixed(2);
        }

        async function scanOi() {
            const interval = document.getElementById("interval").value;
            const res = await fetch(`/api/v1/movers/${interval}`);
            const data = await res.json();
            const table = document.getElementById("results");
            table.innerHTML = "";
            if (data.length === 0) {
                table.innerHTML = "<tr><td colspan='7'>No data</td></tr>";
                return;
            }
            data.forEach(row => {
                const tr = document.createElement("tr");
                tr.innerHTML = `<td>${row.symbol}</td>
                                <td>${fmt(row.oi_change_pct)}%</td>
                                <td>-</td>
                                <td>${fmt(row.current_oi)}</td>
                                <td>${fmt(row.previous_oi)}</td>
                                <td>-</td>
                                <td>-</td>`;
                table.appendChild(tr);
            });
        }

        async function scanCombined() {
            const res = await fetch(`/api/v1/combined`);
            const data = await res.json();
            const table = document.getElementById("results");
            table.innerHTML = "";
            if (data.length === 0) {
                table.innerHTML = "<tr><td colspan='7'>No coins with both OI and Volume rising</td></tr>";
                return;
            }
            data.forEach(row => {
                const tr = document.createElement("tr");
                tr.innerHTML = `<td>${row.symbol}</td>
                                <td>${fmt(row.oi_change_pct)}%</td>
                                <td>${fmt(row.volume_change_pct)}%</td>
                                <td>${fmt(row.current_oi)}</td>
                                <td>${fmt(row.previous_oi)}</td>
                                <td>${fmt(row.current_volume)}</td>
                                <td>${fmt(row.previous_volume)}</td>`;
                table.appendChild(tr);
            });
        }
    </script>
</body>
</html>
"#;
