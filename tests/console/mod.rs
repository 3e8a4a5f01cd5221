mod guard;
mod interceptors;
mod lists;
