mod static_website;
mod context;
