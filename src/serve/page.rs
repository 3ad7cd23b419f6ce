//! Embedded single-page UI.
//!
//! The page is kept as a `&'static str` so it ships inside the binary; only
//! the initial map view is substituted at request time.

use healthreach::config::ServerConfig;

pub fn render(server: &ServerConfig) -> String {
    INDEX_HTML
        .replace("__CENTER_LAT__", &server.map_center[0].to_string())
        .replace("__CENTER_LON__", &server.map_center[1].to_string())
        .replace("__ZOOM__", &server.map_zoom.to_string())
}

const INDEX_HTML: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Hanoi healthcare accessibility</title>
  <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css" crossorigin="" />
  <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js" crossorigin=""></script>
  <style>
    body { font-family: system-ui, sans-serif; margin: 0; display: flex; height: 100vh; }
    #sidebar { width: 380px; padding: 16px; overflow-y: auto; border-right: 1px solid #ddd; }
    #map { flex: 1; }
    .msg { padding: 8px 10px; border-radius: 6px; margin: 8px 0; }
    .msg.success { background: #e6f4ea; color: #1e4620; }
    .msg.warning { background: #fff4e5; color: #663c00; }
    .msg.info { background: #e8f0fe; color: #174ea6; }
    .legend { background: white; padding: 8px 10px; border: 2px solid grey; border-radius: 10px; line-height: 1.5; }
    .legend i { font-style: normal; }
    button { margin: 4px 4px 4px 0; padding: 6px 10px; }
    #chart img { max-width: 100%; }
  </style>
</head>
<body>
  <div id="sidebar">
    <h2>Healthcare accessibility in Hanoi</h2>
    <h3>Choose your location</h3>
    <label><input type="radio" name="mode" value="gps" checked /> Use GPS</label><br />
    <label><input type="radio" name="mode" value="manual" /> Click on the map</label>
    <div id="mode-hint" class="msg info">Press the button below to use your GPS location.</div>
    <button id="gps-btn">Get current location</button>
    <button id="clear-btn">Clear saved location</button>
    <div id="status"></div>
    <div id="results"></div>
    <div id="chart"></div>
  </div>
  <div id="map"></div>
  <script>
    const map = L.map('map').setView([__CENTER_LAT__, __CENTER_LON__], __ZOOM__);
    L.tileLayer('https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png', {
      attribution: '&copy; OpenStreetMap contributors &copy; CARTO', maxZoom: 19
    }).addTo(map);

    const resultLayer = L.layerGroup().addTo(map);
    let sessionId = sessionStorage.getItem('healthreach-session');

    const pointStyle = (f, latlng) => L.circleMarker(latlng, {
      radius: f.properties.radius || 5, color: f.properties.color, fill: true, fillOpacity: 0.7
    }).bindPopup(f.properties.popup || '');

    async function ensureSession() {
      if (sessionId) {
        const probe = await fetch(`/api/sessions/${sessionId}/analysis`);
        if (probe.ok) return;
      }
      const res = await fetch('/api/sessions', { method: 'POST' });
      sessionId = (await res.json()).id;
      sessionStorage.setItem('healthreach-session', sessionId);
    }

    function showStatus(text, kind) {
      document.getElementById('status').innerHTML = text ? `<div class="msg ${kind}">${text}</div>` : '';
    }

    async function send(path, method, body) {
      const res = await fetch(`/api/sessions/${sessionId}/${path}`, {
        method, headers: { 'Content-Type': 'application/json' },
        body: body === undefined ? undefined : JSON.stringify(body)
      });
      const t = await res.json();
      const kind = t.warning ? 'warning' : (t.transition === 'cleared' ? 'info' : 'success');
      showStatus(t.message, kind);
      await refresh();
    }

    async function refresh() {
      resultLayer.clearLayers();
      const res = await fetch(`/api/sessions/${sessionId}/analysis`);
      const data = await res.json();
      const results = document.getElementById('results');
      const chart = document.getElementById('chart');
      if (!data.query) { results.innerHTML = ''; chart.innerHTML = ''; return; }

      const q = data.query;
      L.geoJSON(data.layers.catchment, { style: { color: 'blue', fillOpacity: 0.1 } })
        .bindPopup(data.layers.catchment.properties.popup).addTo(resultLayer);
      L.geoJSON(data.layers.nearest, { pointToLayer: pointStyle }).addTo(resultLayer);
      L.marker([q.lat, q.lon]).bindPopup('Your location').addTo(resultLayer);
      map.setView([q.lat, q.lon], 13);

      let html = `<div class="msg success">Selected location: (${q.lat.toFixed(5)}, ${q.lon.toFixed(5)})</div>`;
      if (data.notice) html += `<div class="msg warning">${data.notice}</div>`;
      html += '<h3>Nearest healthcare facilities</h3><ul>';
      for (const line of data.lines) html += `<li>${line}</li>`;
      html += `</ul><h3>${data.radius_label} catchment</h3>`;
      html += `<p>Facilities within <b>${data.radius_label}</b>: <b>${data.analysis.within_radius.count}</b></p>`;
      results.innerHTML = html;

      chart.innerHTML = data.chart_available
        ? `<img alt="Facility types" src="/api/sessions/${sessionId}/chart.svg?t=${Date.now()}" />`
        : `<div class="msg info">No healthcare facilities within ${data.radius_label}.</div>`;
    }

    const mode = () => document.querySelector('input[name=mode]:checked').value;
    document.querySelectorAll('input[name=mode]').forEach(r => r.addEventListener('change', () => {
      const manual = mode() === 'manual';
      document.getElementById('gps-btn').style.display = manual ? 'none' : '';
      document.getElementById('mode-hint').textContent = manual
        ? 'Click directly on the map to choose a location.'
        : 'Press the button below to use your GPS location.';
    }));

    document.getElementById('gps-btn').addEventListener('click', () => {
      if (!navigator.geolocation) { send('gps', 'POST', null); return; }
      navigator.geolocation.getCurrentPosition(
        pos => send('gps', 'POST', { coords: { latitude: pos.coords.latitude, longitude: pos.coords.longitude } }),
        () => send('gps', 'POST', null),
        { enableHighAccuracy: true, timeout: 15000 }
      );
    });
    document.getElementById('clear-btn').addEventListener('click', () => send('location', 'DELETE'));
    map.on('click', e => { if (mode() === 'manual') send('click', 'POST', { lat: e.latlng.lat, lng: e.latlng.lng }); });

    (async () => {
      await ensureSession();
      const [boundary, facilities, legend] = await Promise.all(
        ['/api/boundary', '/api/facilities', '/api/legend'].map(u => fetch(u).then(r => r.json())));
      L.geoJSON(boundary, { style: { color: '#3388ff', fillOpacity: 0.05 } }).addTo(map);
      L.geoJSON(facilities, { pointToLayer: pointStyle }).addTo(map);

      const control = L.control({ position: 'bottomleft' });
      control.onAdd = () => {
        const div = L.DomUtil.create('div', 'legend');
        div.innerHTML = '<b>Legend</b><br>' + legend.map(e => `<i style="color:${e.color}">&#9679;</i> ${e.label}`).join('<br>');
        return div;
      };
      control.addTo(map);
      await refresh();
    })();
  </script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_view() {
        let html = render(&ServerConfig::default());
        assert!(html.contains("setView([21.0285, 105.8542], 11)"));
        assert!(!html.contains("__CENTER_LAT__"));
        assert!(!html.contains("__ZOOM__"));
    }
}
