#[macro_export]
macro_rules! map {
	($($key:expr => $val:expr),* $(,)?) => {
		std::iter::Iterator::collect(
			[
				$({
					($key, $val)
				},)*
			]
			.into_iter(),
		)
	};
}

#[macro_export]
macro_rules! set {
	($($val:expr),* $(,)?) => {
		std::iter::Iterator::collect(
			[
				$({
					($val)
				},)*
			]
			.into_iter(),
		)
	};
}

/// Builds a `Pipeline` from stage values, appending left to right.
#[macro_export]
macro_rules! pipeline {
	($($stage:expr),* $(,)?) => {{
		#[allow(unused_mut)]
		let mut pipeline = $crate::pipeline::Pipeline::new();
		$(
			pipeline = pipeline.append($stage);
		)*
		pipeline
	}};
}
