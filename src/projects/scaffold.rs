//! Starter template for new projects: React + TypeScript sources that the
//! built-in bundler can handle without a Node toolchain.

use crate::error::{Result, ResultExt};
use serde_json::json;
use std::fs;
use std::path::Path;

pub(super) fn write_template(project_dir: &Path, name: &str) -> Result<()> {
    for dir in ["src", "public", "dist"] {
        let path = project_dir.join(dir);
        fs::create_dir_all(&path).with_path(&path)?;
    }

    let package_json = json!({
        "name": package_name(name),
        "version": "0.1.0",
        "private": true,
        "type": "module",
        "dependencies": {
            "react": "^18.2.0",
            "react-dom": "^18.2.0"
        },
        "scripts": {
            "dev": "vite",
            "build": "vite build",
            "preview": "vite preview"
        }
    });

    let tsconfig = json!({
        "compilerOptions": {
            "target": "ES2020",
            "useDefineForClassFields": true,
            "lib": ["ES2020", "DOM", "DOM.Iterable"],
            "module": "ESNext",
            "skipLibCheck": true,
            "moduleResolution": "bundler",
            "allowImportingTsExtensions": true,
            "resolveJsonModule": true,
            "isolatedModules": true,
            "noEmit": true,
            "jsx": "react-jsx",
            "strict": true
        },
        "include": ["src"]
    });

    let files = [
        ("package.json", serde_json::to_string_pretty(&package_json)?),
        ("tsconfig.json", serde_json::to_string_pretty(&tsconfig)?),
        ("public/index.html", index_html(name)),
        ("src/App.tsx", app_tsx(name)),
        ("src/App.css", APP_CSS.to_string()),
        ("src/main.tsx", MAIN_TSX.to_string()),
        ("src/index.css", INDEX_CSS.to_string()),
        ("README.md", readme(name)),
    ];

    for (relative, content) in files {
        let path = project_dir.join(relative);
        fs::write(&path, content).with_path(&path)?;
    }

    tracing::debug!("wrote starter template to {}", project_dir.display());
    Ok(())
}

/// npm package name: lowercase, spaces to dashes
fn package_name(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "-")
}

fn index_html(name: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="UTF-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0" />
    <title>{name}</title>
  </head>
  <body>
    <div id="root"></div>
  </body>
</html>
"#
    )
}

fn app_tsx(name: &str) -> String {
    format!(
        r#"import {{ useState }} from 'react';
import './App.css';

function App() {{
  const [count, setCount] = useState(0);

  return (
    <div className="App">
      <header className="App-header">
        <h1>Welcome to {name}</h1>
        <p>Built with React + TypeScript</p>
        <div className="card">
          <button onClick={{() => setCount(count + 1)}}>
            count is {{count}}
          </button>
          <p>Edit <code>src/App.tsx</code> and rebuild</p>
        </div>
      </header>
    </div>
  );
}}

export default App;
"#
    )
}

const MAIN_TSX: &str = r#"import React from 'react';
import ReactDOM from 'react-dom/client';
import App from './App';
import './index.css';

ReactDOM.createRoot(document.getElementById('root')!).render(
  <React.StrictMode>
    <App />
  </React.StrictMode>,
);
"#;

const APP_CSS: &str = r#".App {
  text-align: center;
  min-height: 100vh;
  display: flex;
  flex-direction: column;
  align-items: center;
  justify-content: center;
  background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
  color: white;
}

.App-header {
  padding: 2rem;
  max-width: 600px;
}

.card {
  background: rgba(255, 255, 255, 0.1);
  padding: 2em;
  border-radius: 16px;
}

button {
  background: #ffffff;
  color: #667eea;
  border: none;
  border-radius: 8px;
  padding: 0.8em 1.5em;
  font-size: 1.1em;
  font-weight: 600;
  cursor: pointer;
}

code {
  background-color: rgba(255, 255, 255, 0.2);
  padding: 0.2em 0.4em;
  border-radius: 4px;
  font-family: 'Courier New', monospace;
}
"#;

const INDEX_CSS: &str = r#"* {
  margin: 0;
  padding: 0;
  box-sizing: border-box;
}

body {
  font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', 'Roboto', sans-serif;
  -webkit-font-smoothing: antialiased;
  -moz-osx-font-smoothing: grayscale;
}
"#;

fn readme(name: &str) -> String {
    format!(
        r#"# {name}

React + TypeScript starter created by bento.

## Workflow

1. Edit files in `src/`
2. `bento build "{name}"` bundles into `dist/`
3. `bento run "{name}"` serves `dist/` on the configured port

The built-in bundler strips TypeScript syntax, concatenates sources and loads
React from esm.sh. Use `--strategy toolchain` to build with npm instead.
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_name() {
        assert_eq!(package_name("My Cool App"), "my-cool-app");
        assert_eq!(package_name(" demo "), "demo");
    }

    #[test]
    fn test_template_mentions_project_name() {
        assert!(index_html("Demo").contains("<title>Demo</title>"));
        assert!(app_tsx("Demo").contains("Welcome to Demo"));
        assert!(app_tsx("Demo").contains("function App() {"));
    }
}
