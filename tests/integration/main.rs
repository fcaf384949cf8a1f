mod chromium_tests;
mod crawl_tests;
