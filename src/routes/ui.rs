use axum::{response::Html, Router, routing::get};

use crate::extraction::ACCEPTED_EXTENSIONS;

pub fn router() -> Router {
    Router::new().route("/", get(index))
}

async fn index() -> Html<String> {
    let accept = ACCEPTED_EXTENSIONS
        .iter()
        .map(|ext| format!(".{}", ext))
        .collect::<Vec<_>>()
        .join(",");
    Html(PAGE.replace("{{accept}}", &accept))
}

const PAGE: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Document Extractor</title>
  <style>
    body { font-family: Arial, sans-serif; margin: 2rem; color: #1d1d1f; }
    h1 { margin-bottom: 0.5rem; }
    .card { border: 1px solid #ddd; padding: 1rem; border-radius: 8px; margin-bottom: 1rem; }
    label { display: block; margin-top: 0.75rem; font-weight: 600; }
    input, textarea { width: 100%; padding: 0.5rem; }
    textarea { min-height: 6rem; }
    button { margin-top: 1rem; padding: 0.6rem 1rem; }
    .answer { background: #f6f8fa; padding: 1rem; overflow: auto; }
    .answer pre { white-space: pre-wrap; }
    .answer code { background: #eaeef2; padding: 0 0.2rem; }
    .error { color: #b00020; }
  </style>
</head>
<body>
  <h1>Document Extractor</h1>
  <p>Upload a document, describe what to pull out of it, and read the answer below.</p>

  <div class="card">
    <label for="fileInput">Document</label>
    <input id="fileInput" type="file" accept="{{accept}}" />
    <label for="query">What should be extracted?</label>
    <textarea id="query" placeholder="e.g. List the candidate's name, email and years of experience"></textarea>
    <button id="extractBtn">Extract Information</button>
    <div id="status"></div>
  </div>

  <div class="card">
    <h2>Answer</h2>
    <div id="output" class="answer"></div>
  </div>

  <script>
    function escapeHtml(text) {
      return text.replace(/&/g, '&amp;').replace(/</g, '&lt;').replace(/>/g, '&gt;');
    }

    function renderInline(text) {
      return escapeHtml(text)
        .replace(/`([^`]+)`/g, '<code>$1</code>')
        .replace(/\*\*([^*]+)\*\*/g, '<strong>$1</strong>')
        .replace(/\*([^*]+)\*/g, '<em>$1</em>');
    }

    // Markdown subset: headings, lists, fenced code and paragraphs
    function renderMarkdown(markdown) {
      const html = [];
      let list = null;
      let code = null;
      let paragraph = [];
      const flushParagraph = () => {
        if (paragraph.length) html.push('<p>' + paragraph.map(renderInline).join('<br>') + '</p>');
        paragraph = [];
      };
      const closeList = () => {
        if (list) html.push('</' + list + '>');
        list = null;
      };

      for (const line of markdown.split(/\r?\n/)) {
        if (code !== null) {
          if (line.trim().startsWith('```')) {
            html.push('<pre><code>' + escapeHtml(code.join('\n')) + '</code></pre>');
            code = null;
          } else {
            code.push(line);
          }
          continue;
        }
        const heading = line.match(/^(#{1,6})\s+(.*)$/);
        const bullet = line.match(/^\s*[-*+]\s+(.*)$/);
        const numbered = line.match(/^\s*\d+[.)]\s+(.*)$/);
        if (line.trim().startsWith('```')) {
          flushParagraph(); closeList();
          code = [];
        } else if (heading) {
          flushParagraph(); closeList();
          const level = heading[1].length;
          html.push('<h' + level + '>' + renderInline(heading[2]) + '</h' + level + '>');
        } else if (bullet || numbered) {
          flushParagraph();
          const tag = bullet ? 'ul' : 'ol';
          if (list !== tag) { closeList(); html.push('<' + tag + '>'); list = tag; }
          html.push('<li>' + renderInline((bullet || numbered)[1]) + '</li>');
        } else if (!line.trim()) {
          flushParagraph(); closeList();
        } else {
          closeList();
          paragraph.push(line);
        }
      }
      if (code !== null) html.push('<pre><code>' + escapeHtml(code.join('\n')) + '</code></pre>');
      flushParagraph(); closeList();
      return html.join('\n');
    }

    const extractBtn = document.getElementById('extractBtn');
    const output = document.getElementById('output');
    const status = document.getElementById('status');

    extractBtn.addEventListener('click', async () => {
      const fileInput = document.getElementById('fileInput');
      const query = document.getElementById('query').value;
      status.className = '';
      if (!fileInput.files.length) {
        status.textContent = 'Select a file first.';
        return;
      }
      if (!query.trim()) {
        status.textContent = 'Describe what to extract.';
        return;
      }
      const formData = new FormData();
      formData.append('file', fileInput.files[0]);
      formData.append('query', query);
      extractBtn.disabled = true;
      status.textContent = 'Extracting...';
      output.textContent = '';
      try {
        const res = await fetch('/api/extract', { method: 'POST', body: formData });
        const json = await res.json();
        if (res.ok) {
          output.innerHTML = renderMarkdown(json.answer);
          status.textContent = '';
        } else {
          status.className = 'error';
          status.textContent = json.message || 'Extraction failed.';
        }
      } catch (err) {
        status.className = 'error';
        status.textContent = 'Request failed: ' + err;
      } finally {
        extractBtn.disabled = false;
      }
    });
  </script>
</body>
</html>"#;
