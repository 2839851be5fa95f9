// src/api/page.rs — Server-rendered HTML pages

use minijinja::{context, Environment};

use crate::api::types::TaskOption;
use crate::timer::render::{format_clock, IDLE_TITLE};

const LAYOUT: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
{% block meta %}{% endblock %}
<title>{% block title %}{{ app_title }}{% endblock %}</title>
</head>
<body>
{% block body %}{% endblock %}
</body>
</html>
"#;

const LOGIN: &str = r#"{% extends "layout.html" %}
{% block title %}Log In - {{ app_title }}{% endblock %}
{% block body %}
<h1>Log In</h1>
{% if error %}<p class="error">{{ error }}</p>{% endif %}
<form method="post" action="/login">
  <input name="username" placeholder="Username" autocomplete="username" required>
  <input name="password" type="password" placeholder="Password" autocomplete="current-password" required>
  <button type="submit">Log In</button>
</form>
{% endblock %}
"#;

const DASHBOARD: &str = r#"{% extends "layout.html" %}
{% block meta %}<meta name="csrf-token" content="{{ csrf_token }}">{% endblock %}
{% block body %}
<header>Signed in as {{ username }} &middot; <a href="/logout">Log out</a></header>
<section id="timer">
  <div id="timer-display">{{ clock }}</div>
  <p>Run the countdown with <code>pomotask timer --user {{ username }}</code>.</p>
  <dl>
    <dt>Session lengths</dt>
    <dd id="durations">{% for d in durations %}{% if d == default_duration %}<strong>{{ d }} min</strong>{% else %}{{ d }} min{% endif %}{% if not loop.last %}, {% endif %}{% endfor %}</dd>
  </dl>
</section>
<section id="tasks">
  <h2>Pending tasks</h2>
  {% if tasks %}
  <ul>
  {% for task in tasks %}
    <li data-task-id="{{ task.id }}">#{{ task.id }} {{ task.title }} <small>{{ task.priority }}{% if task.deadline %}, due {{ task.deadline }}{% endif %}</small></li>
  {% endfor %}
  </ul>
  {% else %}
  <p>No pending tasks.</p>
  {% endif %}
</section>
<section id="today">
  <p><span id="today-pomodoros">{{ today_pomodoros }}</span> pomodoros today</p>
  <p><span id="today-tasks">{{ today_tasks }}</span> tasks completed today</p>
</section>
{% endblock %}
"#;

/// Template environment with every page registered.
pub fn environment() -> Result<Environment<'static>, minijinja::Error> {
    let mut env = Environment::new();
    env.add_template("layout.html", LAYOUT)?;
    env.add_template("login.html", LOGIN)?;
    env.add_template("dashboard.html", DASHBOARD)?;
    env.add_global("app_title", IDLE_TITLE);
    Ok(env)
}

pub fn render_login(env: &Environment<'_>, error: Option<&str>) -> Result<String, minijinja::Error> {
    env.get_template("login.html")?.render(context! { error })
}

pub struct Dashboard<'a> {
    pub username: &'a str,
    pub csrf_token: &'a str,
    pub durations: &'a [u32],
    pub default_duration: u32,
    pub tasks: &'a [TaskOption],
    pub today_pomodoros: u32,
    pub today_tasks: u32,
}

pub fn render_dashboard(env: &Environment<'_>, page: &Dashboard<'_>) -> Result<String, minijinja::Error> {
    env.get_template("dashboard.html")?.render(context! {
        username => page.username,
        csrf_token => page.csrf_token,
        durations => page.durations,
        default_duration => page.default_duration,
        tasks => page.tasks,
        today_pomodoros => page.today_pomodoros,
        today_tasks => page.today_tasks,
        clock => format_clock(page.default_duration * 60),
    })
}
