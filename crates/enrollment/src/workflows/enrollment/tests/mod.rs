mod common;
mod location;
mod navigation;
mod routing;
mod validation;
